//! Locator resolution.
//!
//! The target page exposes no stable selectors, ids, or documented
//! contract, so both controls are located by an ordered strategy cascade:
//! a robustness ladder from "assume the author left semantic hints" down to
//! "assume nothing and detect by observed effect" (presence of
//! target-script text). A failing strategy is swallowed and logged; only
//! exhaustion of a whole cascade becomes a [`LipiError::LocatorError`].

use std::time::Duration;

use tracing::debug;

use crate::page::{ElementSnapshot, PageDriver};
use crate::result::{LipiError, LipiResult};
use crate::script::ScriptRange;
use crate::selector::{ElementRef, Selector};

/// Resolver knobs, cloned out of the harness config per scenario
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Unicode block of the transliteration output
    pub script: ScriptRange,
    /// Per-strategy time budget (ms)
    pub strategy_budget_ms: u64,
    /// Reject scanned elements whose text exceeds this many characters
    /// (whole-page containers)
    pub scan_len_ceiling: usize,
    /// Placeholder / aria-label hints for the input control
    pub input_hints: Vec<String>,
    /// id/class naming hints for the output element
    pub output_hints: Vec<String>,
    /// Text labels naming the target language
    pub label_names: Vec<String>,
}

impl ResolverConfig {
    fn budget(&self) -> Duration {
        Duration::from_millis(self.strategy_budget_ms)
    }
}

/// Input-control strategies, most to least specific.
///
/// The ordering is policy: signals of semantic intent (identifier hints,
/// test hooks, placeholder text) beat purely structural ones
/// (first-of-many), which are a last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStrategy {
    /// id/name attribute contains "input"
    IdHint,
    /// Test-hook attributes (data-testid and friends)
    TestHook,
    /// Placeholder text hints
    PlaceholderHint,
    /// Accessibility-label hints
    AriaLabelHint,
    /// First text-like editable control
    FirstEditable,
    /// Any editable control at all
    AnyEditable,
}

/// The input cascade, in attempt order
pub const INPUT_CASCADE: [InputStrategy; 6] = [
    InputStrategy::IdHint,
    InputStrategy::TestHook,
    InputStrategy::PlaceholderHint,
    InputStrategy::AriaLabelHint,
    InputStrategy::FirstEditable,
    InputStrategy::AnyEditable,
];

impl InputStrategy {
    /// Strategy name for diagnostics
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IdHint => "id-hint",
            Self::TestHook => "test-hook",
            Self::PlaceholderHint => "placeholder-hint",
            Self::AriaLabelHint => "aria-label-hint",
            Self::FirstEditable => "first-editable",
            Self::AnyEditable => "any-editable",
        }
    }

    fn selector(self, cfg: &ResolverConfig) -> Selector {
        let hints: Vec<&str> = cfg.input_hints.iter().map(String::as_str).collect();
        match self {
            Self::IdHint => Selector::attr_contains(&["id", "name"], &["input"], true),
            Self::TestHook => Selector::attr_contains(
                &["data-testid", "data-test", "data-cy"],
                &["input"],
                false,
            ),
            Self::PlaceholderHint => Selector::attr_contains(&["placeholder"], &hints, true),
            Self::AriaLabelHint => Selector::attr_contains(&["aria-label", "title"], &hints, true),
            Self::FirstEditable => Selector::Editable { strict: true },
            Self::AnyEditable => Selector::Editable { strict: false },
        }
    }
}

/// Output-element strategies, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStrategy {
    /// A second editable control exists (classic two-box translators)
    SecondEditable,
    /// Scan content elements for rendered target-script text below the
    /// size ceiling
    ScriptScan,
    /// Structural naming conventions ("output", "result", "translation")
    NameHint,
    /// A label naming the target language, with a content-bearing element
    /// in its parent subtree
    LabelProximity,
    /// Any element whose own text carries target-script characters
    ScriptAnywhere,
}

/// The output cascade, in attempt order
pub const OUTPUT_CASCADE: [OutputStrategy; 5] = [
    OutputStrategy::SecondEditable,
    OutputStrategy::ScriptScan,
    OutputStrategy::NameHint,
    OutputStrategy::LabelProximity,
    OutputStrategy::ScriptAnywhere,
];

impl OutputStrategy {
    /// Strategy name for diagnostics
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SecondEditable => "second-editable",
            Self::ScriptScan => "script-scan",
            Self::NameHint => "name-hint",
            Self::LabelProximity => "label-proximity",
            Self::ScriptAnywhere => "script-anywhere",
        }
    }
}

/// Resolve the input control.
///
/// # Errors
///
/// [`LipiError::LocatorError`] once every strategy has been exhausted.
pub async fn resolve_input<P: PageDriver + ?Sized>(
    page: &P,
    cfg: &ResolverConfig,
) -> LipiResult<ElementRef> {
    for strategy in INPUT_CASCADE {
        let attempt = tokio::time::timeout(cfg.budget(), page.query(&strategy.selector(cfg))).await;
        match attempt {
            Ok(Ok(snapshots)) => {
                if let Some(snap) = snapshots.into_iter().next() {
                    debug!(strategy = strategy.name(), tag = %snap.tag, "input strategy matched");
                    return Ok(snap.derive_ref(Selector::Editable { strict: false }));
                }
                debug!(strategy = strategy.name(), "input strategy found nothing");
            }
            Ok(Err(err)) => debug!(strategy = strategy.name(), %err, "input strategy failed"),
            Err(_) => debug!(strategy = strategy.name(), "input strategy timed out"),
        }
    }
    Err(LipiError::LocatorError {
        target: "input control".to_string(),
        strategies_tried: INPUT_CASCADE.len(),
    })
}

/// Resolve the output element.
///
/// The output may live in a non-input element; the cascade falls back from
/// a second editable control through content detection, naming
/// conventions, and label proximity, down to a bare content filter.
///
/// # Errors
///
/// [`LipiError::LocatorError`] once every strategy has been exhausted.
pub async fn resolve_output<P: PageDriver + ?Sized>(
    page: &P,
    input_ref: Option<&ElementRef>,
    cfg: &ResolverConfig,
) -> LipiResult<ElementRef> {
    for strategy in OUTPUT_CASCADE {
        let attempt =
            tokio::time::timeout(cfg.budget(), attempt_output(page, strategy, input_ref, cfg))
                .await;
        match attempt {
            Ok(Ok(Some(found))) => {
                debug!(strategy = strategy.name(), tag = %found.tag, "output strategy matched");
                return Ok(found);
            }
            Ok(Ok(None)) => debug!(strategy = strategy.name(), "output strategy found nothing"),
            Ok(Err(err)) => debug!(strategy = strategy.name(), %err, "output strategy failed"),
            Err(_) => debug!(strategy = strategy.name(), "output strategy timed out"),
        }
    }
    Err(LipiError::LocatorError {
        target: "output element".to_string(),
        strategies_tried: OUTPUT_CASCADE.len(),
    })
}

async fn attempt_output<P: PageDriver + ?Sized>(
    page: &P,
    strategy: OutputStrategy,
    input_ref: Option<&ElementRef>,
    cfg: &ResolverConfig,
) -> LipiResult<Option<ElementRef>> {
    match strategy {
        OutputStrategy::SecondEditable => second_editable(page, input_ref).await,
        OutputStrategy::ScriptScan => {
            let selector = Selector::ScriptText {
                range: cfg.script,
                visible_only: true,
                max_len: Some(cfg.scan_len_ceiling),
                own_text: false,
            };
            let snapshots = page.query(&selector).await?;
            Ok(snapshots
                .into_iter()
                .next()
                .map(|snap| snap.derive_ref(Selector::script_anywhere(cfg.script))))
        }
        OutputStrategy::NameHint => {
            for hint in &cfg.output_hints {
                let selector = Selector::name_hint(hint.clone());
                let snapshots = page.query(&selector).await?;
                if let Some(snap) = snapshots.into_iter().next() {
                    return Ok(Some(snap.derive_ref(selector)));
                }
            }
            Ok(None)
        }
        OutputStrategy::LabelProximity => label_proximity(page, cfg).await,
        OutputStrategy::ScriptAnywhere => {
            let selector = Selector::script_anywhere(cfg.script);
            let snapshots = page.query(&selector).await?;
            Ok(snapshots
                .into_iter()
                .next()
                .map(|snap| ElementRef::new(snap.tag, selector)))
        }
    }
}

async fn second_editable<P: PageDriver + ?Sized>(
    page: &P,
    input_ref: Option<&ElementRef>,
) -> LipiResult<Option<ElementRef>> {
    let selector = Selector::Editable { strict: false };
    let snapshots = page.query(&selector).await?;
    if snapshots.len() < 2 {
        return Ok(None);
    }
    // First editable control that is not the resolved input. Without an
    // input reference, assume the first editable is the input.
    let skip = input_ref
        .and_then(|input| picked_index(input, &snapshots))
        .unwrap_or(0);
    let chosen = snapshots
        .iter()
        .enumerate()
        .find(|(index, _)| *index != skip);
    Ok(chosen.map(|(index, snap)| {
        if snap.id.is_some() || !snap.classes.is_empty() {
            snap.derive_ref(selector.clone())
        } else {
            // No identifier to re-derive from; index among same-tag
            // editables keeps the reference stable
            let nth = snapshots[..index]
                .iter()
                .filter(|s| s.tag == snap.tag)
                .count();
            ElementRef::new(&snap.tag, selector.clone()).with_nth(nth)
        }
    }))
}

/// Index within `snapshots` of the element `target` identifies, applying
/// the same selector/tag/nth picking rule as a fresh re-query
fn picked_index(target: &ElementRef, snapshots: &[ElementSnapshot]) -> Option<usize> {
    let mut seen = 0;
    for (index, snap) in snapshots.iter().enumerate() {
        if !target.selector.matches(snap) {
            continue;
        }
        if !target.tag.is_empty() && snap.tag != target.tag {
            continue;
        }
        if seen == target.nth {
            return Some(index);
        }
        seen += 1;
    }
    None
}

async fn label_proximity<P: PageDriver + ?Sized>(
    page: &P,
    cfg: &ResolverConfig,
) -> LipiResult<Option<ElementRef>> {
    for name in &cfg.label_names {
        let labels = page.query(&Selector::label_text(name.clone())).await?;
        if labels.is_empty() {
            continue;
        }
        let candidates = page.query(&Selector::ContentBearing).await?;
        for label in &labels {
            if let Some(found) = nearest_content(label, &candidates) {
                return Ok(Some(found.derive_ref(Selector::script_anywhere(cfg.script))));
            }
        }
    }
    Ok(None)
}

/// First content-bearing element in the label's parent subtree that is
/// neither the label itself nor one of its ancestors
fn nearest_content<'a>(
    label: &ElementSnapshot,
    candidates: &'a [ElementSnapshot],
) -> Option<&'a ElementSnapshot> {
    let parent = label.parent_path();
    if parent.is_empty() {
        return None;
    }
    candidates.iter().find(|c| {
        c.path.starts_with(parent) && c.path != label.path && !label.path.starts_with(&c.path)
    })
}
