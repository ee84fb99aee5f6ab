//! Run reporting.
//!
//! Unexplained string mismatches are the dominant failure mode of a
//! DOM-heuristic system, so every failure carries the raw, normalized, and
//! expected strings for diagnosis.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::LipiResult;
use crate::scenario::{FailureReason, ScenarioReport};

/// Scenario outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Scenario completed its state machine and its predicate held
    Passed,
    /// Scenario failed with a typed reason
    Failed,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Aggregate of one harness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier
    pub run_id: String,
    /// Per-scenario reports, in execution order
    pub reports: Vec<ScenarioReport>,
    /// Number of passing scenarios
    pub passed: usize,
    /// Number of failing scenarios
    pub failed: usize,
    /// Total wall time across scenarios (ms)
    pub duration_ms: u64,
}

impl RunSummary {
    /// Build a summary from collected reports
    #[must_use]
    pub fn from_reports(reports: Vec<ScenarioReport>) -> Self {
        let passed = reports.iter().filter(|r| r.status.is_passed()).count();
        let failed = reports.len() - passed;
        let duration_ms = reports.iter().map(|r| r.duration_ms).sum();
        Self {
            run_id: Uuid::new_v4().to_string(),
            reports,
            passed,
            failed,
            duration_ms,
        }
    }

    /// True when every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Serialize the summary as pretty JSON
    pub fn to_json(&self) -> LipiResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render a human-readable summary
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for report in &self.reports {
            let mark = if report.status.is_passed() {
                "PASS"
            } else {
                "FAIL"
            };
            out.push_str(&format!(
                "{mark}  {} ({:?}) {}ms\n",
                report.case_name, report.category, report.duration_ms
            ));
            if let Some(reason) = &report.failure {
                out.push_str(&format!("      reason:     {}\n", describe(reason)));
                out.push_str(&format!("      state:      {:?}\n", report.state));
                if !report.expected.is_empty() {
                    out.push_str(&format!("      expected:   {}\n", report.expected));
                }
                out.push_str(&format!("      raw:        {}\n", report.raw_output));
                out.push_str(&format!("      normalized: {}\n", report.normalized_output));
            }
        }
        out.push_str(&format!(
            "\n{} passed, {} failed ({} scenarios, {}ms)\n",
            self.passed,
            self.failed,
            self.reports.len(),
            self.duration_ms
        ));
        out
    }
}

fn describe(reason: &FailureReason) -> String {
    match reason {
        FailureReason::Locator { detail } => format!("locator: {detail}"),
        FailureReason::Timeout { ms, detail } => format!("timeout after {ms}ms: {detail}"),
        FailureReason::Mismatch { detail } => format!("assertion mismatch: {detail}"),
        FailureReason::Page { detail } => format!("page: {detail}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scenario::{Category, ScenarioState};

    fn passing_report(name: &str) -> ScenarioReport {
        ScenarioReport {
            case_id: name.to_string(),
            case_name: name.to_string(),
            category: Category::Positive,
            status: TestStatus::Passed,
            state: ScenarioState::Asserted,
            failure: None,
            raw_output: "සුබ".to_string(),
            normalized_output: "සුබ".to_string(),
            expected: "සුබ".to_string(),
            duration_ms: 100,
        }
    }

    fn failing_report(name: &str) -> ScenarioReport {
        ScenarioReport {
            case_id: name.to_string(),
            case_name: name.to_string(),
            category: Category::Positive,
            status: TestStatus::Failed,
            state: ScenarioState::Extracted,
            failure: Some(FailureReason::Mismatch {
                detail: "not equal and prefix missing".to_string(),
            }),
            raw_output: "x".to_string(),
            normalized_output: "x".to_string(),
            expected: "සුබ".to_string(),
            duration_ms: 50,
        }
    }

    #[test]
    fn test_counts_and_duration() {
        let summary =
            RunSummary::from_reports(vec![passing_report("a"), failing_report("b")]);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.duration_ms, 150);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_text_rendering_attaches_strings_on_failure() {
        let summary = RunSummary::from_reports(vec![failing_report("neg-1")]);
        let text = summary.render_text();
        assert!(text.contains("FAIL"));
        assert!(text.contains("expected:   සුබ"));
        assert!(text.contains("normalized: x"));
        assert!(text.contains("assertion mismatch"));
    }

    #[test]
    fn test_json_round_trip() {
        let summary = RunSummary::from_reports(vec![passing_report("a")]);
        let json = summary.to_json().unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.passed, 1);
        assert_eq!(back.reports.len(), 1);
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunSummary::from_reports(vec![]);
        let b = RunSummary::from_reports(vec![]);
        assert_ne!(a.run_id, b.run_id);
    }
}
