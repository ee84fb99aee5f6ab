//! Harness configuration.
//!
//! A scenario owns its page handle and every timeout as explicit parameter
//! state. Nothing here is ambient or global, so scenarios parallelize
//! across independent page handles without coordination.

use serde::{Deserialize, Serialize};

use crate::extract::ExtractorConfig;
use crate::resolver::ResolverConfig;
use crate::result::LipiResult;
use crate::script::ScriptRange;
use crate::wait::PollOptions;

/// Default target page
pub const DEFAULT_TARGET_URL: &str = "https://www.easysinhalaunicode.com/";

/// Default bound on the settle poll (ms)
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 12_000;

/// Default fixed delay absorbing trailing asynchronous updates (ms)
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 800;

/// Default poll interval (ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Default per-strategy time budget in the resolver cascades (ms)
pub const DEFAULT_STRATEGY_BUDGET_MS: u64 = 2_000;

/// All knobs for one harness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Target page URL
    pub target_url: String,
    /// Unicode block of the transliteration output
    pub script: ScriptRange,

    /// Bound on the wait for non-empty output (ms)
    pub settle_timeout_ms: u64,
    /// Fixed delay after output first appears (ms)
    pub settle_delay_ms: u64,
    /// Poll interval for bounded waits (ms)
    pub poll_interval_ms: u64,
    /// Per-strategy time budget in resolver cascades (ms)
    pub strategy_budget_ms: u64,

    /// Short value used to coax late-materializing output nodes into the DOM
    pub probe_value: String,
    /// Maximum residual characters after the UI clear scenario
    pub residual_tolerance: usize,
    /// Characters of the expected string used by the containment fallback
    pub match_prefix_len: usize,

    /// Placeholder / aria-label hints for the input control
    pub input_hints: Vec<String>,
    /// id/class naming hints for the output element
    pub output_hints: Vec<String>,
    /// Text labels naming the target language near the output
    pub label_names: Vec<String>,
    /// Labels of an explicit translate action, if the page has one
    pub trigger_labels: Vec<String>,
    /// Labels of an explicit clear action, if the page has one
    pub clear_labels: Vec<String>,

    /// Length ceiling for a child element to be preferred during extraction
    pub child_len_ceiling: usize,
    /// Length above which extracted text is implausible as a bare result
    pub plausible_len_ceiling: usize,
    /// Length ceiling when scanning content elements for output
    pub scan_len_ceiling: usize,
    /// Single-character tokens in a row that mark a reference table
    pub table_run_threshold: usize,
    /// Marker phrase identifying parenthesized legend blocks
    pub legend_marker: String,
    /// Chrome keywords that betray non-result text
    pub chrome_keywords: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            script: ScriptRange::SINHALA,
            settle_timeout_ms: DEFAULT_SETTLE_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            strategy_budget_ms: DEFAULT_STRATEGY_BUDGET_MS,
            probe_value: "a".to_string(),
            residual_tolerance: 20,
            match_prefix_len: 5,
            input_hints: string_vec(&["input", "singlish", "enter", "type"]),
            output_hints: string_vec(&["output", "result", "translation"]),
            label_names: string_vec(&["sinhala"]),
            trigger_labels: string_vec(&["translate", "convert"]),
            clear_labels: string_vec(&["clear", "reset"]),
            child_len_ceiling: 400,
            plausible_len_ceiling: 160,
            scan_len_ceiling: 1000,
            table_run_threshold: 8,
            legend_marker: "e.g.".to_string(),
            chrome_keywords: string_vec(&[
                "translate",
                "convert",
                "clear",
                "copy",
                "reset",
                "singlish",
                "unicode",
                "keyboard",
                "help",
            ]),
        }
    }
}

impl HarnessConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target page URL
    #[must_use]
    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = url.into();
        self
    }

    /// Set the output script block
    #[must_use]
    pub const fn with_script(mut self, script: ScriptRange) -> Self {
        self.script = script;
        self
    }

    /// Set the settle timeout
    #[must_use]
    pub const fn with_settle_timeout_ms(mut self, ms: u64) -> Self {
        self.settle_timeout_ms = ms;
        self
    }

    /// Set the fixed settle delay
    #[must_use]
    pub const fn with_settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the per-strategy budget
    #[must_use]
    pub const fn with_strategy_budget_ms(mut self, ms: u64) -> Self {
        self.strategy_budget_ms = ms;
        self
    }

    /// Set the residual tolerance for the UI clear scenario
    #[must_use]
    pub const fn with_residual_tolerance(mut self, chars: usize) -> Self {
        self.residual_tolerance = chars;
        self
    }

    /// Resolver view of this config
    #[must_use]
    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig {
            script: self.script,
            strategy_budget_ms: self.strategy_budget_ms,
            scan_len_ceiling: self.scan_len_ceiling,
            input_hints: self.input_hints.clone(),
            output_hints: self.output_hints.clone(),
            label_names: self.label_names.clone(),
        }
    }

    /// Extractor view of this config (compiles the noise patterns)
    pub fn extractor(&self) -> LipiResult<ExtractorConfig> {
        ExtractorConfig::new(
            self.script,
            &self.legend_marker,
            self.chrome_keywords.clone(),
            self.child_len_ceiling,
            self.plausible_len_ceiling,
            self.table_run_threshold,
        )
    }

    /// Poll options for the settle wait
    #[must_use]
    pub const fn poll(&self) -> PollOptions {
        PollOptions {
            timeout_ms: self.settle_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Settle delay as a Duration
    #[must_use]
    pub const fn settle_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settle_delay_ms)
    }
}

fn string_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.script, ScriptRange::SINHALA);
        assert_eq!(config.residual_tolerance, 20);
        assert_eq!(config.match_prefix_len, 5);
        assert!(config.output_hints.iter().any(|h| h == "result"));
    }

    #[test]
    fn test_builder_chain() {
        let config = HarnessConfig::new()
            .with_target_url("http://localhost:8080")
            .with_settle_timeout_ms(3_000)
            .with_poll_interval_ms(50)
            .with_residual_tolerance(5);
        assert_eq!(config.target_url, "http://localhost:8080");
        assert_eq!(config.poll().timeout_ms, 3_000);
        assert_eq!(config.residual_tolerance, 5);
    }

    #[test]
    fn test_views_share_script_range() {
        let config = HarnessConfig::default().with_script(ScriptRange::new(0x0900, 0x097F));
        assert_eq!(config.resolver().script.start, 0x0900);
        assert_eq!(config.extractor().unwrap().script.start, 0x0900);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = HarnessConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: HarnessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.target_url, config.target_url);
        assert_eq!(back.chrome_keywords, config.chrome_keywords);
    }
}
