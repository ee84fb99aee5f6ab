//! Suite runner.
//!
//! Executes an ordered case list, one fresh page handle per scenario.
//! Handles are never shared: the target page keeps hidden mutable state
//! (current input/output values) that would race across concurrent
//! scenarios on one handle. A failing scenario never aborts its siblings.

use std::future::Future;

use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::page::PageDriver;
use crate::reporter::RunSummary;
use crate::result::LipiResult;
use crate::scenario::{run_scenario, ScenarioReport, TestCase};

/// Runs scenarios against the configured target page
#[derive(Debug, Clone)]
pub struct Runner {
    config: HarnessConfig,
}

impl Runner {
    /// Create a runner
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Navigate a page handle to the target and drive one case through it
    pub async fn run_case<P: PageDriver + ?Sized>(
        &self,
        page: &mut P,
        case: &TestCase,
    ) -> ScenarioReport {
        info!(case = %case.id, name = %case.name, "scenario start");
        if let Err(err) = page.navigate(&self.config.target_url).await {
            warn!(case = %case.id, %err, "navigation failed");
            return ScenarioReport::page_failure(case, &err);
        }
        run_scenario(page, case, &self.config).await
    }

    /// Run a whole suite, acquiring a fresh page handle per scenario from
    /// `new_page`. A handle that fails to materialize fails that scenario
    /// only.
    pub async fn run_suite<P, F, Fut>(&self, cases: &[TestCase], mut new_page: F) -> RunSummary
    where
        P: PageDriver,
        F: FnMut() -> Fut,
        Fut: Future<Output = LipiResult<P>>,
    {
        let mut reports = Vec::with_capacity(cases.len());
        for case in cases {
            match new_page().await {
                Ok(mut page) => reports.push(self.run_case(&mut page, case).await),
                Err(err) => {
                    warn!(case = %case.id, %err, "page handle unavailable");
                    reports.push(ScenarioReport::page_failure(case, &err));
                }
            }
        }
        let summary = RunSummary::from_reports(reports);
        info!(
            passed = summary.passed,
            failed = summary.failed,
            "run complete"
        );
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::page::{MockElement, MockPage};
    use crate::result::LipiError;
    use crate::scenario::SizeClass;

    fn fast_config() -> HarnessConfig {
        HarnessConfig::new()
            .with_target_url("http://translit.test/")
            .with_settle_timeout_ms(500)
            .with_settle_delay_ms(1)
            .with_poll_interval_ms(5)
    }

    fn two_box_page() -> MockPage {
        MockPage::builder()
            .element(
                MockElement::new("textarea")
                    .with_id("in")
                    .with_attr("placeholder", "Enter Singlish")
                    .with_value(""),
            )
            .element(MockElement::new("textarea").with_id("out").with_value(""))
            .input("in")
            .output("out")
            .transform(|s| if s == "suba" { "සුබ".to_string() } else { format!("~{s}") })
            .build()
    }

    #[tokio::test]
    async fn test_run_case_navigates_first() {
        let runner = Runner::new(fast_config());
        let mut page = two_box_page();
        let case = TestCase::positive("p1", "greeting", SizeClass::S, "suba", "සුබ");
        let report = runner.run_case(&mut page, &case).await;
        assert!(report.status.is_passed(), "report: {report:?}");
        assert!(page.was_called("navigate:http://translit.test/"));
    }

    #[tokio::test]
    async fn test_suite_isolates_failures() {
        let runner = Runner::new(fast_config());
        let cases = vec![
            TestCase::positive("p1", "wrong expectation", SizeClass::S, "suba", "වැරදි"),
            TestCase::positive("p2", "greeting", SizeClass::S, "suba", "සුබ"),
        ];
        let summary = runner
            .run_suite(&cases, || async { Ok(two_box_page()) })
            .await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.passed, 1);
        assert!(summary.reports[1].status.is_passed());
    }

    #[tokio::test]
    async fn test_unavailable_handle_fails_one_scenario() {
        let runner = Runner::new(fast_config());
        let cases = vec![TestCase::positive(
            "p1",
            "greeting",
            SizeClass::S,
            "suba",
            "සුබ",
        )];
        let summary = runner
            .run_suite(&cases, || async {
                Err::<MockPage, _>(LipiError::BrowserLaunchError {
                    message: "no chromium".to_string(),
                })
            })
            .await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.reports[0].duration_ms, 0);
    }
}
