//! Result and error types for Lipi.

use thiserror::Error;

/// Result type for Lipi operations
pub type LipiResult<T> = Result<T, LipiError>;

/// Errors that can occur while driving and validating a target page
#[derive(Debug, Error)]
pub enum LipiError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Page interaction error (query, fill, click, evaluate)
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// No element matched any strategy in a resolver cascade
    #[error("No {target} found after {strategies_tried} strategies")]
    LocatorError {
        /// What was being resolved ("input control", "output element")
        target: String,
        /// Number of cascade strategies exhausted
        strategies_tried: usize,
    },

    /// An expected state transition did not occur in time
    #[error("Timed out after {ms}ms waiting for {waiting_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waiting_for: String,
    },

    /// Extraction succeeded but content fails the scenario predicate
    #[error("Assertion mismatch: {detail} (expected {expected:?}, got {actual:?})")]
    AssertionMismatch {
        /// Expected string (normalized)
        expected: String,
        /// Actual string (normalized)
        actual: String,
        /// Which predicate failed and how
        detail: String,
    },

    /// Invalid harness configuration
    #[error("Invalid configuration: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LipiError {
    /// True for failures fatal to a scenario but never to the run
    #[must_use]
    pub const fn is_scenario_scoped(&self) -> bool {
        matches!(
            self,
            Self::LocatorError { .. } | Self::Timeout { .. } | Self::AssertionMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_error_message() {
        let err = LipiError::LocatorError {
            target: "input control".to_string(),
            strategies_tried: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("input control"));
        assert!(msg.contains('6'));
    }

    #[test]
    fn test_timeout_message() {
        let err = LipiError::Timeout {
            ms: 12_000,
            waiting_for: "non-empty output".to_string(),
        };
        assert!(err.to_string().contains("12000ms"));
    }

    #[test]
    fn test_scenario_scoped_classification() {
        let locator = LipiError::LocatorError {
            target: "output element".to_string(),
            strategies_tried: 5,
        };
        assert!(locator.is_scenario_scoped());

        let launch = LipiError::BrowserLaunchError {
            message: "no chromium".to_string(),
        };
        assert!(!launch.is_scenario_scoped());
    }
}
