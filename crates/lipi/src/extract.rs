//! Content extraction.
//!
//! The output container is not guaranteed to contain only the translation:
//! reference tables, legend blocks, labels, and buttons may share the DOM
//! subtree. Extraction recovers the signal from that blob using
//! content-shape heuristics rather than structural ones, and returns an
//! empty string on total failure rather than erroring.

use regex::Regex;
use tracing::debug;

use crate::page::{first_match, ElementSnapshot, PageDriver};
use crate::result::{LipiError, LipiResult};
use crate::script::ScriptRange;
use crate::selector::ElementRef;

/// Score bonus for segments mixing target-script and source-script/digit
/// content, the hallmark of a genuine transliteration result embedded
/// among labels
pub const MIXED_CONTENT_BONUS: i64 = 50;

/// Score bonus for segments inside the natural-sentence length window
pub const SENTENCE_WINDOW_BONUS: i64 = 25;

/// Natural-sentence length window, in characters
pub const SENTENCE_WINDOW: (usize, usize) = (10, 200);

/// Unbroken target-script runs at least this long are reference-table
/// artifacts, not sentences
const UNBROKEN_RUN_CEILING: usize = 25;

/// Extractor knobs with pre-compiled noise patterns.
///
/// Compiled once per harness and owned by the scenario; no global state.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Unicode block of the transliteration output
    pub script: ScriptRange,
    /// Length ceiling for a child element to be preferred as the source
    pub child_len_ceiling: usize,
    /// Length above which text is implausible as a bare result
    pub plausible_len_ceiling: usize,
    /// Single-character tokens in a row that mark a reference table
    pub table_run_threshold: usize,
    chrome_keywords: Vec<String>,
    legend_re: Regex,
    range_re: Regex,
    segment_re: Regex,
    run_re: Regex,
    unbroken_re: Regex,
}

impl ExtractorConfig {
    /// Compile an extractor configuration.
    ///
    /// # Errors
    ///
    /// [`LipiError::ConfigError`] if a noise pattern fails to compile.
    pub fn new(
        script: ScriptRange,
        legend_marker: &str,
        chrome_keywords: Vec<String>,
        child_len_ceiling: usize,
        plausible_len_ceiling: usize,
        table_run_threshold: usize,
    ) -> LipiResult<Self> {
        let cls = script.char_class();
        let legend_re = compile(&format!(
            r"(?i)\([^()]*{}[^()]*\)",
            regex::escape(legend_marker)
        ))?;
        let range_re = compile(r"\([^()]*\.\s*\.\s*-[^()]*\)")?;
        let segment_re = compile(r"[\r\n]+|[ \t]{3,}")?;
        let run_re = compile(&format!(
            r#"{cls}(?:[0-9A-Za-z \t.,!?'"-]|{cls})*{cls}|{cls}"#
        ))?;
        let unbroken_re = compile(&format!(r"{cls}{{{UNBROKEN_RUN_CEILING},}}"))?;
        Ok(Self {
            script,
            child_len_ceiling,
            plausible_len_ceiling,
            table_run_threshold,
            chrome_keywords: chrome_keywords.iter().map(|k| k.to_lowercase()).collect(),
            legend_re,
            range_re,
            segment_re,
            run_re,
            unbroken_re,
        })
    }

    /// Run the full text pipeline over raw element content
    #[must_use]
    pub fn refine(&self, raw: &str) -> String {
        let cleaned = self.clean_noise(raw);
        let plausible = cleaned.chars().count() <= self.plausible_len_ceiling
            && !self.has_chrome_keyword(&cleaned);
        let picked = if plausible {
            cleaned
        } else {
            self.best_segment(&cleaned)
                .or_else(|| self.alternating_run(&cleaned))
                .unwrap_or_else(|| self.charclass_filter(&cleaned))
        };
        normalize(&picked)
    }

    /// Strip known noise: parenthesized legend blocks bearing the marker
    /// phrase, `. . -` parenthetical ranges, and character-reference-table
    /// runs. Idempotent.
    #[must_use]
    pub fn clean_noise(&self, text: &str) -> String {
        let text = self.legend_re.replace_all(text, " ");
        let text = self.range_re.replace_all(&text, " ");
        let text = self.unbroken_re.replace_all(&text, " ");
        self.strip_char_tables(&text)
    }

    /// True when the text carries action-button or category labels
    #[must_use]
    pub fn has_chrome_keyword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.chrome_keywords.iter().any(|k| lower.contains(k))
    }

    /// Highest-scoring segment after splitting on whitespace runs and
    /// blank lines.
    ///
    /// Segmentation exists to separate the result from chrome, and chrome
    /// by definition lacks target-script text; when any segment carries
    /// the target script, only those segments compete.
    #[must_use]
    pub fn best_segment(&self, text: &str) -> Option<String> {
        let segments: Vec<&str> = self
            .segment_re
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let scripted: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|s| self.script.in_text(s))
            .collect();
        let pool = if scripted.is_empty() { segments } else { scripted };

        let mut best: Option<(i64, &str)> = None;
        for segment in pool {
            let score = score_segment(segment, self.script);
            // strictly greater keeps the first of equals, preserving
            // document order
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, segment));
            }
        }
        best.map(|(_, segment)| segment.to_string())
    }

    /// Longest run of target-script characters interleaved with
    /// source-script letters, digits, and light punctuation
    #[must_use]
    pub fn alternating_run(&self, text: &str) -> Option<String> {
        self.run_re
            .find_iter(text)
            .max_by_key(|m| m.as_str().chars().count())
            .map(|m| m.as_str().to_string())
    }

    /// Keep only target-script characters, source-script letters/digits,
    /// and common punctuation
    #[must_use]
    pub fn charclass_filter(&self, text: &str) -> String {
        text.chars()
            .filter(|ch| {
                self.script.contains(*ch)
                    || ch.is_ascii_alphanumeric()
                    || ch.is_whitespace()
                    || matches!(ch, '.' | ',' | '!' | '?' | '\'' | '"' | '-' | ':' | ';')
            })
            .collect()
    }

    /// Pick the raw text to refine out of a non-input snapshot: a
    /// qualifying direct child first (containers often wrap both the
    /// translation and surrounding chrome), then direct text nodes, then
    /// the full text content
    #[must_use]
    pub fn select_source(&self, snap: &ElementSnapshot) -> String {
        if let Some(child) = snap.child_texts.iter().find(|t| {
            self.script.in_text(t) && t.chars().count() <= self.child_len_ceiling
        }) {
            return child.clone();
        }
        let own = snap.own_text.trim();
        if !own.is_empty() {
            return own.to_string();
        }
        snap.text.clone()
    }

    /// Drop lines dominated by runs of single-character target-script
    /// tokens (character-reference tables)
    fn strip_char_tables(&self, text: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        for line in text.split('\n') {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let has_run = longest_single_char_run(&tokens, self.script) >= self.table_run_threshold;
            if has_run {
                let kept: Vec<&str> = drop_single_char_runs(&tokens, self.script, self.table_run_threshold);
                lines.push(kept.join(" "));
            } else {
                lines.push(line.to_string());
            }
        }
        lines.join("\n")
    }
}

fn compile(pattern: &str) -> LipiResult<Regex> {
    Regex::new(pattern).map_err(|err| LipiError::ConfigError {
        message: format!("bad noise pattern {pattern:?}: {err}"),
    })
}

fn is_single_script_char(token: &str, script: ScriptRange) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(ch), None) if script.contains(ch))
}

fn longest_single_char_run(tokens: &[&str], script: ScriptRange) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for token in tokens {
        if is_single_script_char(token, script) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn drop_single_char_runs<'a>(
    tokens: &[&'a str],
    script: ScriptRange,
    threshold: usize,
) -> Vec<&'a str> {
    let mut kept: Vec<&'a str> = Vec::new();
    let mut run: Vec<&'a str> = Vec::new();
    for token in tokens {
        if is_single_script_char(token, script) {
            run.push(token);
        } else {
            if run.len() < threshold {
                kept.append(&mut run);
            }
            run.clear();
            kept.push(token);
        }
    }
    if run.len() < threshold {
        kept.append(&mut run);
    }
    kept
}

/// Pure scoring function over a candidate segment: base score is length,
/// with bonuses for mixed content and natural-sentence length.
///
/// Kept free of DOM access so it can be exercised with synthetic noisy
/// strings.
#[must_use]
pub fn score_segment(segment: &str, script: ScriptRange) -> i64 {
    let len = segment.chars().count();
    let mut score = len as i64;
    if script.is_mixed(segment) {
        score += MIXED_CONTENT_BONUS;
    }
    let (lo, hi) = SENTENCE_WINDOW;
    if (lo..=hi).contains(&len) {
        score += SENTENCE_WINDOW_BONUS;
    }
    score
}

/// Trim and collapse internal whitespace runs to one space. Idempotent.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the transliterated string behind an output reference.
///
/// Never fails: a stale reference, a driver error, or an empty element all
/// yield an empty string. Recomputed fresh on every call; results are
/// never cached across scenarios.
pub async fn extract<P: PageDriver + ?Sized>(
    page: &P,
    output: &ElementRef,
    cfg: &ExtractorConfig,
) -> String {
    match try_extract(page, output, cfg).await {
        Ok(text) => text,
        Err(err) => {
            debug!(%err, "extraction failed, returning empty");
            String::new()
        }
    }
}

async fn try_extract<P: PageDriver + ?Sized>(
    page: &P,
    output: &ElementRef,
    cfg: &ExtractorConfig,
) -> LipiResult<String> {
    let Some(snap) = first_match(page, output).await? else {
        return Ok(String::new());
    };
    // A control's value is authoritative and needs no cleaning
    if snap.is_editable() {
        return Ok(normalize(snap.value.as_deref().unwrap_or_default()));
    }
    Ok(cfg.refine(&cfg.select_source(&snap)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::page::{MockElement, MockPage};
    use crate::selector::Selector;

    fn config() -> ExtractorConfig {
        ExtractorConfig::new(
            ScriptRange::SINHALA,
            "e.g.",
            vec![
                "translate".into(),
                "convert".into(),
                "clear".into(),
                "copy".into(),
                "singlish".into(),
                "unicode".into(),
            ],
            400,
            160,
            8,
        )
        .unwrap()
    }

    mod cleaning_tests {
        use super::*;

        #[test]
        fn test_legend_block_stripped() {
            let cfg = config();
            let noisy = "සුබ උදෑසනක් (e.g. a = අ, aa = ආ)";
            assert_eq!(normalize(&cfg.clean_noise(noisy)), "සුබ උදෑසනක්");
        }

        #[test]
        fn test_range_marker_stripped() {
            let cfg = config();
            let noisy = "සුබ (අ . . - ක) උදෑසනක්";
            assert_eq!(normalize(&cfg.clean_noise(noisy)), "සුබ උදෑසනක්");
        }

        #[test]
        fn test_char_table_run_stripped() {
            let cfg = config();
            let noisy = "අ ආ ඇ ඈ ඉ ඊ උ ඌ ඍ ඎ\nසුබ උදෑසනක්";
            assert_eq!(normalize(&cfg.clean_noise(noisy)), "සුබ උදෑසනක්");
        }

        #[test]
        fn test_short_token_run_survives() {
            let cfg = config();
            // Three single-character tokens is a sentence fragment, not a table
            let text = "අ ආ ඇ සුබ";
            assert_eq!(normalize(&cfg.clean_noise(text)), "අ ආ ඇ සුබ");
        }

        #[test]
        fn test_unbroken_run_stripped() {
            let cfg = config();
            let wall: String = "අ".repeat(40);
            let noisy = format!("{wall} සුබ");
            assert_eq!(normalize(&cfg.clean_noise(&noisy)), "සුබ");
        }

        #[test]
        fn test_cleaning_is_idempotent() {
            let cfg = config();
            let noisy = "අ ආ ඇ ඈ ඉ ඊ උ ඌ ඍ ඎ\nසුබ (e.g. a = අ) උදෑසනක් (අ . . - ක)";
            let once = cfg.clean_noise(noisy);
            let twice = cfg.clean_noise(&once);
            assert_eq!(once, twice);
        }
    }

    mod scoring_tests {
        use super::*;

        #[test]
        fn test_score_is_at_least_length() {
            let score = score_segment("hello", ScriptRange::SINHALA);
            assert!(score >= 5);
        }

        #[test]
        fn test_mixed_content_bonus() {
            let range = ScriptRange::SINHALA;
            let pure = score_segment("සුබ උදෑසනක්", range);
            let mixed = score_segment("සුබ 2024 ක්", range);
            assert_eq!(pure, 11 + SENTENCE_WINDOW_BONUS);
            assert_eq!(mixed, 11 + SENTENCE_WINDOW_BONUS + MIXED_CONTENT_BONUS);
        }

        #[test]
        fn test_sentence_window_bonus() {
            let range = ScriptRange::SINHALA;
            assert_eq!(score_segment("短い", range), 2);
            let huge = "x".repeat(500);
            assert_eq!(score_segment(&huge, range), 500);
        }

        #[test]
        fn test_best_segment_prefers_translation_over_labels() {
            let cfg = config();
            let blob = "Translate\nසුබ උදෑසනක් යහපත් දවසක්\nClear Copy";
            assert_eq!(
                cfg.best_segment(blob).unwrap(),
                "සුබ උදෑසනක් යහපත් දවසක්"
            );
        }

        #[test]
        fn test_best_segment_none_on_blank() {
            let cfg = config();
            assert!(cfg.best_segment("  \n \n ").is_none());
        }
    }

    mod fallback_tests {
        use super::*;

        #[test]
        fn test_alternating_run_recovers_longest() {
            let cfg = config();
            let text = "menu සුබ one උදෑසනක් සුබ menu again ක්";
            let run = cfg.alternating_run(text).unwrap();
            assert!(run.contains("සුබ one උදෑසනක් සුබ"));
        }

        #[test]
        fn test_alternating_run_none_without_script() {
            let cfg = config();
            assert!(cfg.alternating_run("plain ascii only").is_none());
        }

        #[test]
        fn test_charclass_filter_drops_symbols() {
            let cfg = config();
            let filtered = cfg.charclass_filter("සුබ ★ udha → ☂ 42!");
            assert_eq!(normalize(&filtered), "සුබ udha 42!");
        }
    }

    mod refine_tests {
        use super::*;

        #[test]
        fn test_plain_result_passes_through() {
            let cfg = config();
            assert_eq!(cfg.refine("  සුබ   උදෑසනක් "), "සුබ උදෑසනක්");
        }

        #[test]
        fn test_chrome_triggers_segmentation() {
            let cfg = config();
            let blob = "Singlish to Sinhala Converter\nසුබ උදෑසනක් යහපත්\nTranslate   Clear";
            assert_eq!(cfg.refine(blob), "සුබ උදෑසනක් යහපත්");
        }

        #[test]
        fn test_empty_refines_to_empty() {
            let cfg = config();
            assert_eq!(cfg.refine(""), "");
            assert_eq!(cfg.refine("   \n  "), "");
        }
    }

    mod source_selection_tests {
        use super::*;

        #[test]
        fn test_child_with_script_preferred() {
            let cfg = config();
            let snap = MockElement::new("div")
                .with_child_texts(&["Sinhala Output", "සුබ උදෑසනක්", "Clear"])
                .snapshot();
            assert_eq!(cfg.select_source(&snap), "සුබ උදෑසනක්");
        }

        #[test]
        fn test_own_text_before_full_text() {
            let cfg = config();
            let mut snap = MockElement::new("div").snapshot();
            snap.own_text = "සුබ".to_string();
            snap.text = "chrome සුබ chrome".to_string();
            assert_eq!(cfg.select_source(&snap), "සුබ");
        }

        #[test]
        fn test_oversized_child_skipped() {
            let cfg = config();
            let wall = "සුබ ".repeat(200);
            let snap = MockElement::new("div")
                .with_child_texts(&[&wall, "සුබ උදෑසනක්"])
                .snapshot();
            assert_eq!(cfg.select_source(&snap), "සුබ උදෑසනක්");
        }
    }

    mod extract_tests {
        use super::*;
        use crate::selector::ElementRef;

        #[tokio::test]
        async fn test_input_value_is_authoritative() {
            let page = MockPage::builder()
                .element(
                    MockElement::new("textarea")
                        .with_id("out")
                        .with_value("  සුබ   උදෑසනක් "),
                )
                .build();
            let r = ElementRef::new("textarea", Selector::css("#out"));
            assert_eq!(extract(&page, &r, &config()).await, "සුබ උදෑසනක්");
        }

        #[tokio::test]
        async fn test_stale_reference_yields_empty() {
            let page = MockPage::builder().build();
            let r = ElementRef::new("div", Selector::css("#gone"));
            assert_eq!(extract(&page, &r, &config()).await, "");
        }

        #[tokio::test]
        async fn test_noisy_container_recovers_translation() {
            let page = MockPage::builder()
                .element(
                    MockElement::new("div")
                        .with_id("out")
                        .with_child_texts(&["Sinhala Unicode", "සුබ උදෑසනක්", "Copy"]),
                )
                .build();
            let r = ElementRef::new("div", Selector::css("#out"));
            assert_eq!(extract(&page, &r, &config()).await, "සුබ උදෑසනක්");
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_cleaning_is_idempotent(text in ".{0,200}") {
                let cfg = config();
                let once = cfg.clean_noise(&text);
                prop_assert_eq!(cfg.clean_noise(&once), once);
            }

            #[test]
            fn prop_normalize_is_idempotent(text in ".{0,200}") {
                let once = normalize(&text);
                prop_assert_eq!(normalize(&once), once);
            }

            #[test]
            fn prop_score_is_total_and_length_bounded(text in ".{0,300}") {
                let score = score_segment(&text, ScriptRange::SINHALA);
                let len = text.chars().count() as i64;
                prop_assert!(score >= len);
                prop_assert!(score <= len + MIXED_CONTENT_BONUS + SENTENCE_WINDOW_BONUS);
            }

            #[test]
            fn prop_refine_never_panics(text in ".{0,300}") {
                let cfg = config();
                let _ = cfg.refine(&text);
            }
        }
    }
}
