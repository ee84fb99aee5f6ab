//! Structural selectors for heuristic element resolution.
//!
//! The target page exposes no stable contract, so selectors here describe
//! *signals* (naming hints, editability, script-range content, label
//! proximity) rather than fixed CSS paths. Each variant has two equivalent
//! interpretations: [`Selector::matches`] evaluates it against an
//! [`ElementSnapshot`] in Rust (used by the mock driver and for re-query
//! stability checks), and [`Selector::to_js`] compiles it to a JavaScript
//! query returning JSON snapshots (used by the CDP driver).

use serde::{Deserialize, Serialize};

use crate::page::ElementSnapshot;
use crate::script::ScriptRange;

/// Cap on snapshots returned per query, to bound transport from the page
pub const SNAPSHOT_LIMIT: usize = 64;

/// Tags treated as content-bearing when scanning for transliteration output
pub const CONTENT_TAGS: [&str; 9] = [
    "div", "span", "p", "td", "li", "pre", "output", "section", "article",
];

const CONTENT_CSS: &str = "div, span, p, td, li, pre, output, section, article";
const EDITABLE_CSS: &str = "input, textarea, [contenteditable='true']";
const ACTION_CSS: &str = "button, input[type='submit'], input[type='button'], a, [role='button']";

/// Maximum text length for an element to be considered a short label
const LABEL_LEN_CEILING: usize = 48;

/// A selector over the live DOM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// Raw CSS selector (derived `#id` / `tag.class` references)
    Css(String),
    /// Editable text controls; `strict` limits to text-like inputs
    Editable {
        /// Only text-like inputs (type text/search/absent), not any editable
        strict: bool,
    },
    /// Elements whose attribute value contains one of the needles,
    /// case-insensitive
    AttrContains {
        /// Attribute names to inspect
        attrs: Vec<String>,
        /// Lowercase substrings to look for
        needles: Vec<String>,
        /// Restrict candidates to editable controls
        editable_only: bool,
    },
    /// Visible elements whose id or class list contains a naming hint
    NameHint {
        /// Lowercase substring ("output", "result", ...)
        needle: String,
    },
    /// Content-bearing elements currently rendered
    ContentBearing,
    /// Elements whose text falls in the target script range
    ScriptText {
        /// The script block to detect
        range: ScriptRange,
        /// Require a layout box
        visible_only: bool,
        /// Reject elements whose text exceeds this many characters
        max_len: Option<usize>,
        /// Test direct text nodes only, admitting any tag; otherwise test
        /// full text content of content-bearing tags
        own_text: bool,
    },
    /// Short visible elements whose text contains a label, case-insensitive
    LabelText {
        /// Lowercase label substring ("sinhala")
        needle: String,
    },
    /// Visible clickable controls labeled with a case-insensitive needle
    ActionControl {
        /// Lowercase substring of the control's text/value/id
        needle: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Attribute-substring selector over editable controls
    #[must_use]
    pub fn attr_contains(attrs: &[&str], needles: &[&str], editable_only: bool) -> Self {
        Self::AttrContains {
            attrs: attrs.iter().map(|a| (*a).to_lowercase()).collect(),
            needles: needles.iter().map(|n| (*n).to_lowercase()).collect(),
            editable_only,
        }
    }

    /// Naming-convention hint selector
    #[must_use]
    pub fn name_hint(needle: impl Into<String>) -> Self {
        Self::NameHint {
            needle: needle.into().to_lowercase(),
        }
    }

    /// Label-text selector
    #[must_use]
    pub fn label_text(needle: impl Into<String>) -> Self {
        Self::LabelText {
            needle: needle.into().to_lowercase(),
        }
    }

    /// Action-control selector
    #[must_use]
    pub fn action_control(needle: impl Into<String>) -> Self {
        Self::ActionControl {
            needle: needle.into().to_lowercase(),
        }
    }

    /// Content-filter selector over any element with target-script own text.
    /// The last-resort output reference when an element has no id or class.
    #[must_use]
    pub const fn script_anywhere(range: ScriptRange) -> Self {
        Self::ScriptText {
            range,
            visible_only: false,
            max_len: None,
            own_text: true,
        }
    }

    /// Evaluate this selector against a snapshot
    #[must_use]
    pub fn matches(&self, snap: &ElementSnapshot) -> bool {
        match self {
            Self::Css(css) => css_matches(css, snap),
            Self::Editable { strict } => {
                if *strict {
                    snap.is_text_editable()
                } else {
                    snap.is_editable()
                }
            }
            Self::AttrContains {
                attrs,
                needles,
                editable_only,
            } => {
                (!*editable_only || snap.is_editable())
                    && attrs.iter().any(|attr| {
                        snap.attr_lower(attr)
                            .is_some_and(|v| needles.iter().any(|n| v.contains(n)))
                    })
            }
            Self::NameHint { needle } => snap.visible && snap.name_blob().contains(needle),
            Self::ContentBearing => snap.visible && is_content_tag(&snap.tag),
            Self::ScriptText {
                range,
                visible_only,
                max_len,
                own_text,
            } => {
                let text = if *own_text { &snap.own_text } else { &snap.text };
                (!*visible_only || snap.visible)
                    && (*own_text || is_content_tag(&snap.tag))
                    && max_len.map_or(true, |m| text.chars().count() <= m)
                    && range.in_text(text)
            }
            Self::LabelText { needle } => {
                let text = snap.text.trim();
                snap.visible
                    && text.chars().count() < LABEL_LEN_CEILING
                    && text.to_lowercase().contains(needle)
            }
            Self::ActionControl { needle } => {
                snap.visible && snap.is_clickable() && snap.action_blob().contains(needle)
            }
        }
    }

    /// JavaScript expression evaluating to the candidate element array,
    /// filtered, in document order
    #[must_use]
    pub fn to_candidates_js(&self) -> String {
        format!(
            "Array.from(document.querySelectorAll({css})).filter({pred})",
            css = js_str(self.candidate_css()),
            pred = self.predicate_js(),
        )
    }

    /// Full JavaScript query returning an array of JSON snapshots
    #[must_use]
    pub fn to_js(&self) -> String {
        format!(
            "(() => {{\n{helpers}\nconst candidates = {candidates};\nreturn candidates.slice(0, {limit}).map(snap);\n}})()",
            helpers = SNAPSHOT_HELPERS_JS,
            candidates = self.to_candidates_js(),
            limit = SNAPSHOT_LIMIT,
        )
    }

    fn candidate_css(&self) -> &str {
        match self {
            Self::Css(css) => css,
            Self::Editable { .. } => EDITABLE_CSS,
            Self::AttrContains { editable_only, .. } => {
                if *editable_only {
                    EDITABLE_CSS
                } else {
                    "*"
                }
            }
            Self::ContentBearing => CONTENT_CSS,
            Self::ScriptText { own_text, .. } => {
                if *own_text {
                    "*"
                } else {
                    CONTENT_CSS
                }
            }
            Self::NameHint { .. } | Self::LabelText { .. } => "*",
            Self::ActionControl { .. } => ACTION_CSS,
        }
    }

    /// JavaScript arrow predicate applied to each candidate element
    fn predicate_js(&self) -> String {
        match self {
            Self::Css(_) => "(el) => true".to_string(),
            Self::Editable { strict } => format!("(el) => {}(el)", editable_fn_js(*strict)),
            Self::AttrContains {
                attrs,
                needles,
                editable_only,
            } => {
                let guard = if *editable_only {
                    format!("{}(el) && ", editable_fn_js(false))
                } else {
                    String::new()
                };
                format!(
                    "(el) => {guard}{attrs}.some((a) => {needles}.some((n) => (el.getAttribute(a) || '').toLowerCase().includes(n)))",
                    attrs = js_str_array(attrs),
                    needles = js_str_array(needles),
                )
            }
            Self::NameHint { needle } => format!(
                "(el) => __lipiVisible(el) && ((el.id || '') + ' ' + (el.className || '')).toLowerCase().includes({})",
                js_str(needle)
            ),
            Self::ContentBearing => "(el) => __lipiVisible(el)".to_string(),
            Self::ScriptText {
                range,
                visible_only,
                max_len,
                own_text,
            } => {
                let source = if *own_text {
                    "__lipiOwnText(el)"
                } else {
                    "(el.textContent || '')"
                };
                let len_check = max_len.map_or(String::from("true"), |m| {
                    format!("Array.from(t).length <= {m}")
                });
                let vis_check = if *visible_only {
                    "__lipiVisible(el)"
                } else {
                    "true"
                };
                format!(
                    "(el) => {{ const t = {source}; return {vis_check} && {len_check} && __lipiHasScript(t, {start}, {end}); }}",
                    start = range.start,
                    end = range.end,
                )
            }
            Self::LabelText { needle } => format!(
                "(el) => {{ const t = (el.textContent || '').trim(); return __lipiVisible(el) && t.length < {LABEL_LEN_CEILING} && t.toLowerCase().includes({}); }}",
                js_str(needle)
            ),
            Self::ActionControl { needle } => format!(
                "(el) => __lipiVisible(el) && ((el.textContent || '') + ' ' + (el.value || '') + ' ' + (el.id || '') + ' ' + (el.getAttribute('aria-label') || '')).toLowerCase().includes({})",
                js_str(needle)
            ),
        }
    }
}

/// A resolved, re-queryable reference to a DOM node.
///
/// Immutable once resolved. Re-querying may fail if the page re-rendered;
/// callers treat an empty re-query as "not found", never as a crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    /// Tag name observed at resolution time ("" when unknown)
    pub tag: String,
    /// Selector that re-identifies the node
    pub selector: Selector,
    /// Index among same-tag matches (two-box pages resolve the second
    /// editable control)
    pub nth: usize,
}

impl ElementRef {
    /// Create a reference to the first same-tag match of `selector`
    #[must_use]
    pub fn new(tag: impl Into<String>, selector: Selector) -> Self {
        Self {
            tag: tag.into(),
            selector,
            nth: 0,
        }
    }

    /// Set the same-tag match index
    #[must_use]
    pub const fn with_nth(mut self, nth: usize) -> Self {
        self.nth = nth;
        self
    }

    /// Pick the snapshot this reference identifies out of a fresh query
    /// result, preserving document order
    #[must_use]
    pub fn pick<'a>(&self, snapshots: &'a [ElementSnapshot]) -> Option<&'a ElementSnapshot> {
        if self.tag.is_empty() {
            snapshots.get(self.nth)
        } else {
            snapshots
                .iter()
                .filter(|s| s.tag == self.tag)
                .nth(self.nth)
        }
    }

    /// JavaScript expression evaluating to the referenced element or null
    #[must_use]
    pub fn to_pick_js(&self) -> String {
        let tag_filter = if self.tag.is_empty() {
            String::from("candidates")
        } else {
            format!(
                "candidates.filter((el) => el.tagName.toLowerCase() === {})",
                js_str(&self.tag)
            )
        };
        format!(
            "(() => {{\n{helpers}\nconst candidates = {candidates};\nreturn {tag_filter}[{nth}] || null;\n}})",
            helpers = SNAPSHOT_HELPERS_JS,
            candidates = self.selector.to_candidates_js(),
            nth = self.nth,
        )
    }
}

/// Shared JavaScript helpers injected into every page-side query
const SNAPSHOT_HELPERS_JS: &str = r"const __lipiVisible = (el) => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
const __lipiHasScript = (s, lo, hi) => { for (const ch of s || '') { const c = ch.codePointAt(0); if (c >= lo && c <= hi) return true; } return false; };
const __lipiOwnText = (el) => Array.from(el.childNodes).filter((n) => n.nodeType === 3).map((n) => n.textContent).join(' ').trim();
const __lipiPath = (el) => { const parts = []; for (let n = el; n && n.tagName; n = n.parentElement) { let p = n.tagName.toLowerCase(); if (n.id) { p += '#' + n.id; } else if (n.classList && n.classList.length) { p += '.' + n.classList[0]; } parts.unshift(p); } return parts.join('>'); };
const snap = (el) => ({
  tag: el.tagName.toLowerCase(),
  id: el.id || null,
  classes: el.classList ? Array.from(el.classList) : [],
  attributes: Object.fromEntries(Array.from(el.attributes).map((a) => [a.name, a.value])),
  text: el.textContent || '',
  ownText: __lipiOwnText(el),
  childTexts: Array.from(el.children).map((c) => (c.textContent || '').trim()),
  value: ('value' in el) ? String(el.value == null ? '' : el.value) : null,
  visible: __lipiVisible(el),
  path: __lipiPath(el),
});";

fn editable_fn_js(strict: bool) -> String {
    let type_check = if strict {
        "['text', 'search', ''].includes(ty)"
    } else {
        "!['checkbox', 'radio', 'hidden', 'file', 'image', 'range', 'color', 'submit', 'button', 'reset'].includes(ty)"
    };
    format!(
        "((el) => {{ const t = el.tagName.toLowerCase(); if (t === 'textarea') return true; if (el.isContentEditable || el.getAttribute('contenteditable') === 'true') return true; if (t !== 'input') return false; const ty = (el.getAttribute('type') || '').toLowerCase(); return {type_check}; }})"
    )
}

/// Check whether a tag is content-bearing
#[must_use]
pub fn is_content_tag(tag: &str) -> bool {
    CONTENT_TAGS.contains(&tag)
}

/// Minimal CSS matching for derived references: comma lists of
/// `tag`, `#id`, `.class`, `tag#id`, `tag.class`
fn css_matches(css: &str, snap: &ElementSnapshot) -> bool {
    css.split(',').map(str::trim).any(|simple| {
        if simple.is_empty() {
            return false;
        }
        let (tag, rest) = match simple.find(['#', '.']) {
            Some(pos) => (&simple[..pos], &simple[pos..]),
            None => (simple, ""),
        };
        if !tag.is_empty() && snap.tag != tag {
            return false;
        }
        if let Some(id) = rest.strip_prefix('#') {
            return snap.id.as_deref() == Some(id);
        }
        if let Some(class) = rest.strip_prefix('.') {
            return snap.classes.iter().any(|c| c == class);
        }
        !tag.is_empty()
    })
}

fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

fn js_str_array(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| String::from("[]"))
}
