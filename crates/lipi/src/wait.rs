//! Bounded polling.
//!
//! Every wait in the harness is a bounded poll, never an indefinite block.
//! Exceeding a bound surfaces as a typed [`LipiError::Timeout`], scoped to
//! the scenario that was waiting.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::result::{LipiError, LipiResult};

/// Options for a bounded poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            poll_interval_ms: 250,
        }
    }
}

impl PollOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Timeout as a Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval as a Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Poll `probe` until it reports true, bounded by `opts.timeout_ms`.
///
/// A probe error counts as "condition not met yet" rather than aborting the
/// wait: the page may be mid-re-render when the probe runs.
pub async fn poll_until<F, Fut>(opts: &PollOptions, waiting_for: &str, mut probe: F) -> LipiResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LipiResult<bool>>,
{
    let deadline = Instant::now() + opts.timeout();
    loop {
        match probe().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => debug!(%err, waiting_for, "probe failed, still waiting"),
        }
        if Instant::now() >= deadline {
            return Err(LipiError::Timeout {
                ms: opts.timeout_ms,
                waiting_for: waiting_for.to_string(),
            });
        }
        tokio::time::sleep(opts.poll_interval()).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_poll_options_builder() {
        let opts = PollOptions::new().with_timeout(500).with_poll_interval(10);
        assert_eq!(opts.timeout(), Duration::from_millis(500));
        assert_eq!(opts.poll_interval(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_poll_succeeds_once_condition_holds() {
        let calls = AtomicUsize::new(0);
        let opts = PollOptions::new().with_timeout(1_000).with_poll_interval(1);
        let result = poll_until(&opts, "third call", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(n >= 2) }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_times_out_with_typed_error() {
        let opts = PollOptions::new().with_timeout(20).with_poll_interval(5);
        let result = poll_until(&opts, "never", || async { Ok(false) }).await;
        match result {
            Err(LipiError::Timeout { ms, waiting_for }) => {
                assert_eq!(ms, 20);
                assert_eq!(waiting_for, "never");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_errors_do_not_abort_the_wait() {
        let calls = AtomicUsize::new(0);
        let opts = PollOptions::new().with_timeout(1_000).with_poll_interval(1);
        let result = poll_until(&opts, "after error", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(LipiError::PageError {
                        message: "mid-render".to_string(),
                    })
                } else {
                    Ok(true)
                }
            }
        })
        .await;
        assert!(result.is_ok());
    }
}
