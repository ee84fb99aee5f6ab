//! Page-automation capability surface.
//!
//! The core depends on this trait only, never on a specific automation
//! product. A scenario borrows one page handle for its whole lifetime;
//! handles are never shared between scenarios because the target page keeps
//! hidden mutable state (current input/output values).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::{LipiError, LipiResult};
use crate::selector::{ElementRef, Selector, SNAPSHOT_LIMIT};

const TEXT_INPUT_TYPES: [&str; 3] = ["", "text", "search"];
const NON_TEXT_INPUT_TYPES: [&str; 9] = [
    "checkbox", "radio", "hidden", "file", "image", "range", "color", "submit", "button",
];

/// Point-in-time observation of a DOM node.
///
/// Drivers produce these from live queries; all resolution and extraction
/// heuristics run over snapshots in Rust.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSnapshot {
    /// Lowercase tag name
    pub tag: String,
    /// Element id, if any
    pub id: Option<String>,
    /// Class list
    pub classes: Vec<String>,
    /// Attribute map
    pub attributes: HashMap<String, String>,
    /// Full text content (all descendants)
    pub text: String,
    /// Direct text nodes only, nested elements excluded
    pub own_text: String,
    /// Text content of each direct child element
    pub child_texts: Vec<String>,
    /// Control value, for elements that carry one
    pub value: Option<String>,
    /// Whether the element currently has a layout box
    pub visible: bool,
    /// Ancestor path, e.g. `html>body>div#main>div.row`
    pub path: String,
}

impl ElementSnapshot {
    /// Lowercased attribute lookup
    #[must_use]
    pub fn attr_lower(&self, name: &str) -> Option<String> {
        self.attributes.get(name).map(|v| v.to_lowercase())
    }

    fn input_type(&self) -> String {
        self.attr_lower("type").unwrap_or_default()
    }

    /// Any editable control: input (non-button kinds), textarea,
    /// contenteditable
    #[must_use]
    pub fn is_editable(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => {
                let ty = self.input_type();
                !NON_TEXT_INPUT_TYPES.contains(&ty.as_str()) && ty != "reset"
            }
            _ => self.attr_lower("contenteditable").as_deref() == Some("true"),
        }
    }

    /// Text-like editable control only (input type text/search/absent,
    /// textarea, contenteditable)
    #[must_use]
    pub fn is_text_editable(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => TEXT_INPUT_TYPES.contains(&self.input_type().as_str()),
            _ => self.attr_lower("contenteditable").as_deref() == Some("true"),
        }
    }

    /// Clickable control (button, link, submit input, ARIA button)
    #[must_use]
    pub fn is_clickable(&self) -> bool {
        match self.tag.as_str() {
            "button" | "a" => true,
            "input" => matches!(self.input_type().as_str(), "submit" | "button"),
            _ => self.attr_lower("role").as_deref() == Some("button"),
        }
    }

    /// id + classes, lowercased, for naming-convention hints
    #[must_use]
    pub fn name_blob(&self) -> String {
        let mut blob = self.id.clone().unwrap_or_default();
        for class in &self.classes {
            blob.push(' ');
            blob.push_str(class);
        }
        blob.to_lowercase()
    }

    /// text + value + id + aria-label, lowercased, for action controls
    #[must_use]
    pub fn action_blob(&self) -> String {
        format!(
            "{} {} {} {}",
            self.text,
            self.value.as_deref().unwrap_or_default(),
            self.id.as_deref().unwrap_or_default(),
            self.attributes.get("aria-label").map_or("", String::as_str),
        )
        .to_lowercase()
    }

    /// Ancestor path with the element's own segment removed
    #[must_use]
    pub fn parent_path(&self) -> &str {
        self.path
            .rfind('>')
            .map_or("", |pos| &self.path[..pos])
    }

    /// Derive a re-queryable reference: identifier, then class, then the
    /// supplied content-filter fallback
    #[must_use]
    pub fn derive_ref(&self, fallback: Selector) -> ElementRef {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return ElementRef::new(&self.tag, Selector::css(format!("#{id}")));
        }
        if let Some(class) = self.classes.first().filter(|c| !c.is_empty()) {
            return ElementRef::new(&self.tag, Selector::css(format!("{}.{class}", self.tag)));
        }
        ElementRef::new(&self.tag, fallback)
    }
}

/// Abstract page-automation capability.
///
/// Every method is a suspension point that yields to the driving runtime
/// while the remote page processes the instruction. Implementations:
/// `ChromiumPage` (CDP, behind the `browser` feature) and [`MockPage`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the document to load
    async fn navigate(&mut self, url: &str) -> LipiResult<()>;

    /// Query matching elements, in document order, capped at
    /// [`SNAPSHOT_LIMIT`](crate::selector::SNAPSHOT_LIMIT)
    async fn query(&self, selector: &Selector) -> LipiResult<Vec<ElementSnapshot>>;

    /// Set the value of an editable control, dispatching input events
    async fn set_value(&self, target: &ElementRef, text: &str) -> LipiResult<()>;

    /// Clear the value of an editable control
    async fn clear_value(&self, target: &ElementRef) -> LipiResult<()>;

    /// Click an element
    async fn click(&self, target: &ElementRef) -> LipiResult<()>;

    /// Evaluate a read-only script in page context
    async fn evaluate(&self, script: &str) -> LipiResult<serde_json::Value>;
}

/// Re-query a reference and pick the snapshot it identifies.
///
/// `Ok(None)` means the reference went stale or never matched; callers
/// treat that as "not found", never as a crash.
pub async fn first_match<P: PageDriver + ?Sized>(
    page: &P,
    target: &ElementRef,
) -> LipiResult<Option<ElementSnapshot>> {
    let snapshots = page.query(&target.selector).await?;
    Ok(target.pick(&snapshots).cloned())
}

// ============================================================================
// Mock driver
// ============================================================================

/// Transliteration transform plugged into [`MockPage`]
pub type MockTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Renders transliterated text into the mock output element
pub type MockOutputRender = Arc<dyn Fn(&mut MockElement, &str) + Send + Sync>;

/// An element of the simulated page
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    /// Lowercase tag name
    pub tag: String,
    /// Element id
    pub id: Option<String>,
    /// Class list
    pub classes: Vec<String>,
    /// Attribute map
    pub attributes: HashMap<String, String>,
    /// Full text content
    pub text: String,
    /// Direct text nodes
    pub own_text: String,
    /// Direct child element texts
    pub child_texts: Vec<String>,
    /// Control value
    pub value: Option<String>,
    /// Layout-box presence
    pub visible: bool,
    /// Ancestor path
    pub path: String,
}

impl MockElement {
    /// Create a visible element with an auto-derived path
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            path: format!("html>body>{tag}"),
            visible: true,
            tag,
            ..Self::default()
        }
    }

    /// Set the element id (mirrored into the attribute map, as a live
    /// DOM's `el.attributes` would be)
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.path = format!("html>body>{}#{id}", self.tag);
        self.attributes.insert("id".to_string(), id.clone());
        self.id = Some(id);
        self
    }

    /// Add a class (mirrored into the attribute map)
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if self.id.is_none() && self.classes.is_empty() {
            self.path = format!("html>body>{}.{class}", self.tag);
        }
        self.classes.push(class);
        self.attributes
            .insert("class".to_string(), self.classes.join(" "));
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set full text and direct text together
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.own_text.clone_from(&text);
        self.text = text;
        self
    }

    /// Set child element texts; full text becomes their join
    #[must_use]
    pub fn with_child_texts(mut self, children: &[&str]) -> Self {
        self.child_texts = children.iter().map(|c| (*c).to_string()).collect();
        self.text = self.child_texts.join("\n");
        self.own_text.clear();
        self
    }

    /// Give the element a value (editable controls)
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Mark the element as having no layout box
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Override the ancestor path
    #[must_use]
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Observe this element as a snapshot
    #[must_use]
    pub fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            tag: self.tag.clone(),
            id: self.id.clone(),
            classes: self.classes.clone(),
            attributes: self.attributes.clone(),
            text: self.text.clone(),
            own_text: self.own_text.clone(),
            child_texts: self.child_texts.clone(),
            value: self.value.clone(),
            visible: self.visible,
            path: self.path.clone(),
        }
    }
}

struct MockState {
    url: String,
    elements: Vec<MockElement>,
    transform: Option<MockTransform>,
    render: MockOutputRender,
    reactive: bool,
    input_id: Option<String>,
    output_id: Option<String>,
    trigger_id: Option<String>,
    clear_id: Option<String>,
    fills_seen: usize,
    materialize_after: usize,
    calls: Vec<String>,
}

/// In-memory page driver simulating a transliterating target page.
///
/// Models reactive pages (output updates on every value change) and
/// trigger-based pages (output updates only when the trigger control is
/// clicked), plus an optional clear control that resets both boxes.
pub struct MockPage {
    state: Mutex<MockState>,
}

impl std::fmt::Debug for MockPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPage").finish_non_exhaustive()
    }
}

/// Builder for [`MockPage`]
pub struct MockPageBuilder {
    elements: Vec<MockElement>,
    transform: Option<MockTransform>,
    render: MockOutputRender,
    reactive: bool,
    input_id: Option<String>,
    output_id: Option<String>,
    trigger_id: Option<String>,
    clear_id: Option<String>,
    materialize_after: usize,
}

impl std::fmt::Debug for MockPageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPageBuilder")
            .field("elements", &self.elements.len())
            .finish_non_exhaustive()
    }
}

fn default_render(el: &mut MockElement, output: &str) {
    if el.value.is_some() || el.tag == "input" || el.tag == "textarea" {
        el.value = Some(output.to_string());
    } else {
        el.text = output.to_string();
        el.own_text = output.to_string();
        el.child_texts.clear();
    }
    if !output.is_empty() {
        el.visible = true;
    }
}

impl Default for MockPageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPageBuilder {
    /// Create an empty builder (reactive mode, default renderer)
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            transform: None,
            render: Arc::new(default_render),
            reactive: true,
            input_id: None,
            output_id: None,
            trigger_id: None,
            clear_id: None,
            materialize_after: 0,
        }
    }

    /// Append an element in document order
    #[must_use]
    pub fn element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Install the transliteration transform
    #[must_use]
    pub fn transform(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Custom output renderer (noisy DOM simulations)
    #[must_use]
    pub fn render_output_with(
        mut self,
        f: impl Fn(&mut MockElement, &str) + Send + Sync + 'static,
    ) -> Self {
        self.render = Arc::new(f);
        self
    }

    /// Designate the input element by id
    #[must_use]
    pub fn input(mut self, id: impl Into<String>) -> Self {
        self.input_id = Some(id.into());
        self
    }

    /// Designate the output element by id
    #[must_use]
    pub fn output(mut self, id: impl Into<String>) -> Self {
        self.output_id = Some(id.into());
        self
    }

    /// Trigger-based mode: output updates only when this control is clicked
    #[must_use]
    pub fn trigger(mut self, id: impl Into<String>) -> Self {
        self.trigger_id = Some(id.into());
        self.reactive = false;
        self
    }

    /// Designate a clear control that resets input and output
    #[must_use]
    pub fn clear_control(mut self, id: impl Into<String>) -> Self {
        self.clear_id = Some(id.into());
        self
    }

    /// Suppress output rendering until this many fills have landed
    /// (simulates pages that materialize the output node only after
    /// first input)
    #[must_use]
    pub const fn materialize_after(mut self, fills: usize) -> Self {
        self.materialize_after = fills;
        self
    }

    /// Build the page
    #[must_use]
    pub fn build(self) -> MockPage {
        MockPage {
            state: Mutex::new(MockState {
                url: String::new(),
                elements: self.elements,
                transform: self.transform,
                render: self.render,
                reactive: self.reactive,
                input_id: self.input_id,
                output_id: self.output_id,
                trigger_id: self.trigger_id,
                clear_id: self.clear_id,
                fills_seen: 0,
                materialize_after: self.materialize_after,
                calls: Vec::new(),
            }),
        }
    }
}

impl MockPage {
    /// Start building a mock page
    #[must_use]
    pub fn builder() -> MockPageBuilder {
        MockPageBuilder::new()
    }

    /// Call history for verification
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Check whether a method was invoked
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().calls.iter().any(|c| c.starts_with(method))
    }

    /// Current value of the designated input element
    #[must_use]
    pub fn input_value(&self) -> String {
        let state = self.lock();
        state
            .input_id
            .as_ref()
            .and_then(|id| state.elements.iter().find(|e| e.id.as_ref() == Some(id)))
            .and_then(|e| e.value.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl MockState {
    fn index_of(&self, target: &ElementRef) -> Option<usize> {
        let snapshots: Vec<(usize, ElementSnapshot)> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| target.selector.matches(&e.snapshot()))
            .map(|(i, e)| (i, e.snapshot()))
            .collect();
        let picked: Vec<&(usize, ElementSnapshot)> = if target.tag.is_empty() {
            snapshots.iter().collect()
        } else {
            snapshots.iter().filter(|(_, s)| s.tag == target.tag).collect()
        };
        picked.get(target.nth).map(|(i, _)| *i)
    }

    fn rerender_output(&mut self) {
        if self.fills_seen < self.materialize_after {
            return;
        }
        let Some(transform) = self.transform.clone() else {
            return;
        };
        let input_value = self
            .input_id
            .as_ref()
            .and_then(|id| self.elements.iter().find(|e| e.id.as_ref() == Some(id)))
            .and_then(|e| e.value.clone())
            .unwrap_or_default();
        let output = if input_value.trim().is_empty() {
            String::new()
        } else {
            transform(&input_value)
        };
        let render = self.render.clone();
        if let Some(id) = self.output_id.clone() {
            if let Some(el) = self.elements.iter_mut().find(|e| e.id.as_ref() == Some(&id)) {
                render(el, &output);
            }
        }
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&mut self, url: &str) -> LipiResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("navigate:{url}"));
        state.url = url.to_string();
        Ok(())
    }

    async fn query(&self, selector: &Selector) -> LipiResult<Vec<ElementSnapshot>> {
        let mut state = self.lock();
        state.calls.push("query".to_string());
        Ok(state
            .elements
            .iter()
            .map(MockElement::snapshot)
            .filter(|s| selector.matches(s))
            .take(SNAPSHOT_LIMIT)
            .collect())
    }

    async fn set_value(&self, target: &ElementRef, text: &str) -> LipiResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("set_value:{text}"));
        let idx = state.index_of(target).ok_or_else(|| LipiError::PageError {
            message: "set_value target not found".to_string(),
        })?;
        state.elements[idx].value = Some(text.to_string());
        state.fills_seen += 1;
        if state.reactive {
            state.rerender_output();
        }
        Ok(())
    }

    async fn clear_value(&self, target: &ElementRef) -> LipiResult<()> {
        let mut state = self.lock();
        state.calls.push("clear_value".to_string());
        let idx = state.index_of(target).ok_or_else(|| LipiError::PageError {
            message: "clear_value target not found".to_string(),
        })?;
        state.elements[idx].value = Some(String::new());
        if state.reactive {
            state.rerender_output();
        }
        Ok(())
    }

    async fn click(&self, target: &ElementRef) -> LipiResult<()> {
        let mut state = self.lock();
        state.calls.push("click".to_string());
        let idx = state.index_of(target).ok_or_else(|| LipiError::PageError {
            message: "click target not found".to_string(),
        })?;
        let clicked_id = state.elements[idx].id.clone();
        if clicked_id.is_some() && clicked_id == state.trigger_id {
            state.rerender_output();
        } else if clicked_id.is_some() && clicked_id == state.clear_id {
            if let Some(input_id) = state.input_id.clone() {
                if let Some(el) = state
                    .elements
                    .iter_mut()
                    .find(|e| e.id.as_ref() == Some(&input_id))
                {
                    el.value = Some(String::new());
                }
            }
            state.rerender_output();
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> LipiResult<serde_json::Value> {
        let mut state = self.lock();
        state.calls.push(format!("evaluate:{script}"));
        Ok(serde_json::Value::Null)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::script::ScriptRange;

    fn textarea(id: &str) -> MockElement {
        MockElement::new("textarea").with_id(id).with_value("")
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_editable_classification() {
            let snap = MockElement::new("textarea").snapshot();
            assert!(snap.is_editable());
            assert!(snap.is_text_editable());

            let snap = MockElement::new("input")
                .with_attr("type", "checkbox")
                .snapshot();
            assert!(!snap.is_editable());

            let snap = MockElement::new("div")
                .with_attr("contenteditable", "true")
                .snapshot();
            assert!(snap.is_text_editable());
        }

        #[test]
        fn test_parent_path() {
            let snap = MockElement::new("span")
                .at_path("html>body>div#main>span.out")
                .snapshot();
            assert_eq!(snap.parent_path(), "html>body>div#main");
        }

        #[test]
        fn test_derive_ref_prefers_id() {
            let snap = MockElement::new("div").with_id("result").snapshot();
            let r = snap.derive_ref(Selector::ContentBearing);
            assert_eq!(r.selector, Selector::css("#result"));
            assert_eq!(r.tag, "div");
        }

        #[test]
        fn test_derive_ref_falls_back_to_class_then_filter() {
            let snap = MockElement::new("div").with_class("outputBox").snapshot();
            let r = snap.derive_ref(Selector::ContentBearing);
            assert_eq!(r.selector, Selector::css("div.outputBox"));

            let bare = MockElement::new("div").snapshot();
            let fallback = Selector::script_anywhere(ScriptRange::SINHALA);
            let r = bare.derive_ref(fallback.clone());
            assert_eq!(r.selector, fallback);
        }
    }

    mod mock_page_tests {
        use super::*;

        #[tokio::test]
        async fn test_navigate_records_history() {
            let mut page = MockPage::builder().build();
            page.navigate("https://example.test").await.unwrap();
            assert!(page.was_called("navigate"));
        }

        #[tokio::test]
        async fn test_query_filters_and_orders() {
            let page = MockPage::builder()
                .element(textarea("in"))
                .element(MockElement::new("div").with_id("out"))
                .element(textarea("other"))
                .build();
            let editables = page
                .query(&Selector::Editable { strict: false })
                .await
                .unwrap();
            assert_eq!(editables.len(), 2);
            assert_eq!(editables[0].id.as_deref(), Some("in"));
        }

        #[tokio::test]
        async fn test_reactive_fill_updates_output() {
            let page = MockPage::builder()
                .element(textarea("in"))
                .element(MockElement::new("div").with_id("out"))
                .input("in")
                .output("out")
                .transform(|s| format!("<{s}>"))
                .build();
            let input = ElementRef::new("textarea", Selector::css("#in"));
            page.set_value(&input, "abc").await.unwrap();
            let out = first_match(&page, &ElementRef::new("div", Selector::css("#out")))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(out.text, "<abc>");
        }

        #[tokio::test]
        async fn test_trigger_mode_waits_for_click() {
            let page = MockPage::builder()
                .element(textarea("in"))
                .element(MockElement::new("div").with_id("out"))
                .element(MockElement::new("button").with_id("go").with_text("Translate"))
                .input("in")
                .output("out")
                .trigger("go")
                .transform(|s| s.to_uppercase())
                .build();
            let input = ElementRef::new("textarea", Selector::css("#in"));
            page.set_value(&input, "abc").await.unwrap();
            let out_ref = ElementRef::new("div", Selector::css("#out"));
            assert_eq!(first_match(&page, &out_ref).await.unwrap().unwrap().text, "");

            page.click(&ElementRef::new("button", Selector::css("#go")))
                .await
                .unwrap();
            assert_eq!(
                first_match(&page, &out_ref).await.unwrap().unwrap().text,
                "ABC"
            );
        }

        #[tokio::test]
        async fn test_clear_control_resets_both() {
            let page = MockPage::builder()
                .element(textarea("in"))
                .element(MockElement::new("div").with_id("out"))
                .element(MockElement::new("button").with_id("wipe").with_text("Clear"))
                .input("in")
                .output("out")
                .clear_control("wipe")
                .transform(|s| s.to_string())
                .build();
            let input = ElementRef::new("textarea", Selector::css("#in"));
            page.set_value(&input, "abc").await.unwrap();
            page.click(&ElementRef::new("button", Selector::css("#wipe")))
                .await
                .unwrap();
            assert_eq!(page.input_value(), "");
            let out = first_match(&page, &ElementRef::new("div", Selector::css("#out")))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(out.text, "");
        }

        #[tokio::test]
        async fn test_stale_reference_is_not_found() {
            let page = MockPage::builder().element(textarea("in")).build();
            let gone = ElementRef::new("div", Selector::css("#missing"));
            assert!(first_match(&page, &gone).await.unwrap().is_none());
        }
    }
}
