//! Scenario execution: the interaction driver and assertion engine.
//!
//! One scenario drives one test case through a fixed state machine:
//!
//! `Init → InputResolved → OutputResolved → Filled → Settled → Extracted →
//! Asserted`
//!
//! terminal on success or on the first typed failure. A scenario borrows
//! its page handle exclusively; failures are scenario-scoped and never
//! abort sibling scenarios.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::extract::{extract, normalize, ExtractorConfig};
use crate::page::{first_match, PageDriver};
use crate::reporter::TestStatus;
use crate::resolver::{resolve_input, resolve_output};
use crate::result::{LipiError, LipiResult};
use crate::script::ScriptRange;
use crate::selector::{ElementRef, Selector};

/// Scenario class, driving the pass/fail contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Output must equal the expected string (with a bounded-prefix
    /// containment fallback)
    Positive,
    /// Output must be non-empty and differ from the input
    Negative,
    /// Output must track input state: clearing the input near-empties the
    /// output
    Ui,
}

/// Input size class, for reporting only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeClass {
    /// Short input (a word or two)
    S,
    /// Medium input (a phrase)
    M,
    /// Long input (a sentence or more)
    L,
}

/// An externally supplied test case. Immutable; one case drives exactly
/// one scenario execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Case identifier, used only for reporting
    pub id: String,
    /// Human-readable name, used only for reporting
    pub name: String,
    /// Scenario class
    pub category: Category,
    /// Input size class
    pub size_class: SizeClass,
    /// Literal input string
    pub input: String,
    /// Literal target string for positive cases; a descriptive rationale
    /// for negative cases; a behavioral description for UI cases
    pub expected: String,
}

impl TestCase {
    /// Create a positive case
    #[must_use]
    pub fn positive(
        id: impl Into<String>,
        name: impl Into<String>,
        size_class: SizeClass,
        input: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: Category::Positive,
            size_class,
            input: input.into(),
            expected: expected.into(),
        }
    }

    /// Create a negative case; `rationale` documents why the input is
    /// malformed and is never matched against the output
    #[must_use]
    pub fn negative(
        id: impl Into<String>,
        name: impl Into<String>,
        size_class: SizeClass,
        input: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: Category::Negative,
            size_class,
            input: input.into(),
            expected: rationale.into(),
        }
    }

    /// Create a UI case; `behavior` describes the expected clear-tracking
    #[must_use]
    pub fn ui(
        id: impl Into<String>,
        name: impl Into<String>,
        size_class: SizeClass,
        input: impl Into<String>,
        behavior: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: Category::Ui,
            size_class,
            input: input.into(),
            expected: behavior.into(),
        }
    }
}

/// States of the scenario machine, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScenarioState {
    /// Nothing resolved yet
    Init,
    /// Input control located
    InputResolved,
    /// Output element located
    OutputResolved,
    /// Input written, trigger invoked if present
    Filled,
    /// Output observed non-empty and the settle delay elapsed
    Settled,
    /// Content extracted
    Extracted,
    /// Category predicate evaluated
    Asserted,
}

/// Typed failure reason attached to a failed scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FailureReason {
    /// No element matched any strategy
    Locator {
        /// Diagnostic context
        detail: String,
    },
    /// An expected state transition did not occur in time
    Timeout {
        /// The exceeded bound (ms)
        ms: u64,
        /// What was awaited
        detail: String,
    },
    /// Extraction succeeded but the category predicate failed
    Mismatch {
        /// Which predicate failed and how
        detail: String,
    },
    /// The page capability itself failed
    Page {
        /// Driver error message
        detail: String,
    },
}

impl From<&LipiError> for FailureReason {
    fn from(err: &LipiError) -> Self {
        match err {
            LipiError::LocatorError { .. } => Self::Locator {
                detail: err.to_string(),
            },
            LipiError::Timeout { ms, waiting_for } => Self::Timeout {
                ms: *ms,
                detail: waiting_for.clone(),
            },
            LipiError::AssertionMismatch { detail, .. } => Self::Mismatch {
                detail: detail.clone(),
            },
            other => Self::Page {
                detail: other.to_string(),
            },
        }
    }
}

/// Per-scenario outcome with diagnosis material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Case identifier
    pub case_id: String,
    /// Case name
    pub case_name: String,
    /// Scenario class
    pub category: Category,
    /// Pass/fail
    pub status: TestStatus,
    /// Last state reached
    pub state: ScenarioState,
    /// Failure reason, when failed
    pub failure: Option<FailureReason>,
    /// Raw extracted string
    pub raw_output: String,
    /// Normalized extracted string
    pub normalized_output: String,
    /// Expected string (normalized, positive cases only)
    pub expected: String,
    /// Scenario wall time (ms)
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Report a scenario that failed before its page handle was usable
    #[must_use]
    pub fn page_failure(case: &TestCase, err: &LipiError) -> Self {
        Self {
            case_id: case.id.clone(),
            case_name: case.name.clone(),
            category: case.category,
            status: TestStatus::Failed,
            state: ScenarioState::Init,
            failure: Some(FailureReason::from(err)),
            raw_output: String::new(),
            normalized_output: String::new(),
            expected: String::new(),
            duration_ms: 0,
        }
    }
}

struct ScenarioCtx<'a> {
    case: &'a TestCase,
    started: Instant,
    state: ScenarioState,
    raw: String,
    normalized: String,
    expected: String,
}

impl<'a> ScenarioCtx<'a> {
    fn new(case: &'a TestCase) -> Self {
        Self {
            case,
            started: Instant::now(),
            state: ScenarioState::Init,
            raw: String::new(),
            normalized: String::new(),
            expected: String::new(),
        }
    }

    fn report(self, status: TestStatus, failure: Option<FailureReason>) -> ScenarioReport {
        ScenarioReport {
            case_id: self.case.id.clone(),
            case_name: self.case.name.clone(),
            category: self.case.category,
            status,
            state: self.state,
            failure,
            raw_output: self.raw,
            normalized_output: self.normalized,
            expected: self.expected,
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    fn pass(self) -> ScenarioReport {
        info!(case = %self.case.id, "scenario passed");
        self.report(TestStatus::Passed, None)
    }

    fn fail(self, err: &LipiError) -> ScenarioReport {
        info!(case = %self.case.id, state = ?self.state, %err, "scenario failed");
        self.report(TestStatus::Failed, Some(FailureReason::from(err)))
    }
}

/// Drive one test case through the scenario state machine.
///
/// The page handle is borrowed exclusively for the whole scenario; the
/// caller is responsible for navigation beforehand and disposal afterward.
pub async fn run_scenario<P: PageDriver + ?Sized>(
    page: &P,
    case: &TestCase,
    cfg: &HarnessConfig,
) -> ScenarioReport {
    let mut ctx = ScenarioCtx::new(case);
    let rcfg = cfg.resolver();
    let xcfg = match cfg.extractor() {
        Ok(xcfg) => xcfg,
        Err(err) => return ctx.fail(&err),
    };

    // Init -> InputResolved
    let input_ref = match resolve_input(page, &rcfg).await {
        Ok(r) => r,
        Err(err) => return ctx.fail(&err),
    };
    ctx.state = ScenarioState::InputResolved;

    // Clearing before writing guards against residual state from a
    // previous scenario; the page never resets controls itself.
    if let Err(err) = page.clear_value(&input_ref).await {
        return ctx.fail(&err);
    }
    if let Err(err) = page.set_value(&input_ref, &case.input).await {
        return ctx.fail(&err);
    }

    // InputResolved -> OutputResolved, with a probe retry: some pages only
    // materialize the output node after first input.
    let output_ref = match resolve_output(page, Some(&input_ref), &rcfg).await {
        Ok(r) => r,
        Err(_) => {
            debug!(case = %case.id, "output not found, probing with a short value");
            let _ = page.set_value(&input_ref, &cfg.probe_value).await;
            tokio::time::sleep(cfg.settle_delay()).await;
            let retried = resolve_output(page, Some(&input_ref), &rcfg).await;
            let _ = page.clear_value(&input_ref).await;
            if let Err(err) = page.set_value(&input_ref, &case.input).await {
                return ctx.fail(&err);
            }
            match retried {
                Ok(r) => r,
                Err(err) => return ctx.fail(&err),
            }
        }
    };
    ctx.state = ScenarioState::OutputResolved;

    // The target may be reactive or trigger-based; invoke an explicit
    // translate action when one exists and tolerate its absence.
    if click_labeled(page, &cfg.trigger_labels).await {
        debug!(case = %case.id, "trigger control invoked");
    }
    ctx.state = ScenarioState::Filled;

    // Filled -> Settled
    let script = cfg.script;
    let poll = cfg.poll();
    let settled = crate::wait::poll_until(&poll, "non-empty output", || {
        output_ready(page, &output_ref, script)
    })
    .await;
    if let Err(err) = settled {
        return ctx.fail(&err);
    }
    tokio::time::sleep(cfg.settle_delay()).await;
    ctx.state = ScenarioState::Settled;

    // Settled -> Extracted
    ctx.raw = extract(page, &output_ref, &xcfg).await;
    ctx.normalized = normalize(&ctx.raw);
    ctx.state = ScenarioState::Extracted;

    // Extracted -> Asserted, by scenario class
    let verdict = match case.category {
        Category::Positive => {
            ctx.expected = normalize(&case.expected);
            assert_positive(&ctx.normalized, &ctx.expected, cfg.match_prefix_len)
        }
        Category::Negative => assert_negative(&ctx.normalized, &case.input),
        Category::Ui => {
            assert_ui_clear(page, &input_ref, &output_ref, cfg, &xcfg, &ctx.normalized).await
        }
    };
    ctx.state = ScenarioState::Asserted;
    match verdict {
        Ok(()) => ctx.pass(),
        Err(err) => ctx.fail(&err),
    }
}

async fn output_ready<P: PageDriver + ?Sized>(
    page: &P,
    output: &ElementRef,
    script: ScriptRange,
) -> LipiResult<bool> {
    let Some(snap) = first_match(page, output).await? else {
        return Ok(false);
    };
    if snap.is_editable() {
        Ok(snap
            .value
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty()))
    } else {
        Ok(script.in_text(&snap.text))
    }
}

/// Click the first visible control matching one of `labels`; best-effort
async fn click_labeled<P: PageDriver + ?Sized>(page: &P, labels: &[String]) -> bool {
    for label in labels {
        let selector = Selector::action_control(label.clone());
        let Ok(snapshots) = page.query(&selector).await else {
            continue;
        };
        if let Some(snap) = snapshots.into_iter().next() {
            let target = snap.derive_ref(selector);
            if page.click(&target).await.is_ok() {
                return true;
            }
        }
    }
    false
}

/// Positive contract: exact normalized equality, with bounded-prefix
/// containment as a fallback.
///
/// The prefix fallback tolerates minor non-semantic formatting drift; it
/// is a deliberately loose criterion (a known precision trade-off), kept
/// as-is rather than silently tightened.
fn assert_positive(actual: &str, expected: &str, prefix_len: usize) -> LipiResult<()> {
    if actual == expected {
        return Ok(());
    }
    let prefix: String = expected.chars().take(prefix_len).collect();
    if !prefix.is_empty() && actual.contains(&prefix) {
        return Ok(());
    }
    Err(LipiError::AssertionMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
        detail: format!("output neither equals expected nor contains prefix {prefix:?}"),
    })
}

/// Negative contract: some transformation occurred (output differs from
/// input) and the system attempted something (output non-empty)
fn assert_negative(actual: &str, input: &str) -> LipiResult<()> {
    if actual.is_empty() {
        return Err(LipiError::AssertionMismatch {
            expected: "any non-empty transformation".to_string(),
            actual: String::new(),
            detail: "no output produced for malformed input".to_string(),
        });
    }
    if actual == normalize(input) {
        return Err(LipiError::AssertionMismatch {
            expected: "output differing from input".to_string(),
            actual: actual.to_string(),
            detail: "output is identical to the input, no transformation occurred".to_string(),
        });
    }
    Ok(())
}

/// UI contract: with non-empty output confirmed, clearing the input (and
/// an explicit clear action, if present) drives the output near-empty
/// within the settle window, proving output state tracks input state.
async fn assert_ui_clear<P: PageDriver + ?Sized>(
    page: &P,
    input_ref: &ElementRef,
    output_ref: &ElementRef,
    cfg: &HarnessConfig,
    xcfg: &ExtractorConfig,
    initial: &str,
) -> LipiResult<()> {
    if initial.is_empty() {
        return Err(LipiError::AssertionMismatch {
            expected: "non-empty output before clearing".to_string(),
            actual: String::new(),
            detail: "nothing to clear, output never appeared".to_string(),
        });
    }
    page.clear_value(input_ref).await?;
    if click_labeled(page, &cfg.clear_labels).await {
        debug!("clear control invoked");
    }
    tokio::time::sleep(cfg.settle_delay()).await;

    let residual = extract(page, output_ref, xcfg).await;
    let residual_len = residual.chars().count();
    if residual_len <= cfg.residual_tolerance {
        Ok(())
    } else {
        Err(LipiError::AssertionMismatch {
            expected: format!("residual output of at most {} chars", cfg.residual_tolerance),
            detail: format!(
                "output kept {residual_len} chars after clear, stale content persists"
            ),
            actual: residual,
        })
    }
}
