//! The page-control capability consumed by the crawl engine.
//!
//! Every component that touches the page goes through [`PageDriver`];
//! nothing else in the engine depends on a concrete automation
//! technology. Elements are addressed by re-resolvable [`Locator`]s
//! (a CSS selector plus a disambiguating index) that are re-queried
//! immediately before each interaction - a locator that no longer
//! resolves reports `Ok(false)` and the caller treats it as a normal
//! skip condition.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Re-resolvable element descriptor: the selector that produced the
/// element and its position within that selector's match list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub css: String,
    pub index: usize,
}

impl Locator {
    pub fn new(css: impl Into<String>, index: usize) -> Self {
        Self {
            css: css.into(),
            index,
        }
    }
}

/// A DOM element as reported by [`PageDriver::find_elements`].
#[derive(Debug, Clone)]
pub struct ElementInfo {
    pub locator: Locator,
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub visible: bool,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A form (or form-like container) harvested from the current page.
#[derive(Debug, Clone)]
pub struct RawForm {
    pub action: String,
    pub method: String,
    pub id: String,
    pub css_class: String,
    pub inputs: Vec<RawInput>,
    pub submit_controls: Vec<RawSubmitControl>,
    /// Inputs found outside a `<form>` element, grouped by their
    /// nearest form-like container.
    pub container: bool,
    /// The form lives inside an overlay surface (modal, dialog,
    /// dropdown, collapse, popover, tab panel) that is currently
    /// visible.
    pub in_overlay: bool,
}

/// A single input, select or textarea inside a harvested form.
#[derive(Debug, Clone)]
pub struct RawInput {
    pub locator: Locator,
    pub tag: String,
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub required: bool,
    /// Option texts, populated for `<select>` elements only.
    pub options: Vec<String>,
    pub checked: bool,
}

/// A candidate submit control found inside a harvested form.
#[derive(Debug, Clone)]
pub struct RawSubmitControl {
    pub locator: Locator,
    pub tag: String,
    pub input_type: String,
    pub css_class: String,
    pub value: String,
    pub text: String,
    pub visible: bool,
}

/// An anchor harvested from the current page.
#[derive(Debug, Clone)]
pub struct RawLink {
    pub locator: Locator,
    pub href: String,
    pub text: String,
    pub visible: bool,
}

/// A clickable element that carries no navigable URL: buttons,
/// ARIA `role=button`, elements with click bindings or pointer cursor.
#[derive(Debug, Clone)]
pub struct RawClickable {
    pub locator: Locator,
    pub tag: String,
    pub text: String,
}

/// The capability surface wrapped around the external browser
/// automation layer. All operations are blocking; the crawl model is
/// single-threaded by design since a browser session is a stateful,
/// single-focus resource.
pub trait PageDriver {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Block until the document root is present, or fail with
    /// [`DriverError::Timeout`](crate::error::DriverError::Timeout).
    fn wait_until_ready(&mut self, timeout: Duration) -> Result<()>;

    fn current_url(&mut self) -> Result<String>;

    fn title(&mut self) -> Result<String>;

    fn page_source(&mut self) -> Result<String>;

    /// Enumerate forms and form-like containers with their inputs and
    /// candidate submit controls, in document order.
    fn harvest_forms(&mut self) -> Result<Vec<RawForm>>;

    /// Enumerate anchors carrying an `href`.
    fn harvest_links(&mut self) -> Result<Vec<RawLink>>;

    /// Enumerate interactive non-anchor elements.
    fn harvest_clickables(&mut self) -> Result<Vec<RawClickable>>;

    fn find_elements(&mut self, selector: &str) -> Result<Vec<ElementInfo>>;

    /// Set a field's value and dispatch input/change/blur
    /// notifications so framework-bound UI reacts. `Ok(false)` means
    /// the locator no longer resolves.
    fn fill(&mut self, target: &Locator, value: &str) -> Result<bool>;

    fn select_by_index(&mut self, target: &Locator, option_index: usize) -> Result<bool>;

    fn set_checked(&mut self, target: &Locator, checked: bool) -> Result<bool>;

    /// Native click, falling back to synthetic mouse-event dispatch.
    /// `Ok(false)` means the locator no longer resolves.
    fn click(&mut self, target: &Locator) -> Result<bool>;

    /// Submit the form owning `target` by dispatching Enter on it.
    fn submit_via_enter(&mut self, target: &Locator) -> Result<bool>;

    fn execute_script(&mut self, script: &str) -> Result<serde_json::Value>;

    fn screenshot(&mut self) -> Result<Vec<u8>>;

    fn send_escape(&mut self) -> Result<()>;

    /// Scope subsequent DOM operations to the Nth iframe on the page.
    fn switch_to_frame(&mut self, index: usize) -> Result<()>;

    fn switch_to_default(&mut self) -> Result<()>;

    /// Blocking settle delay between interactions. Drivers backed by a
    /// real browser sleep here; the test driver overrides this with a
    /// no-op.
    fn settle(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
