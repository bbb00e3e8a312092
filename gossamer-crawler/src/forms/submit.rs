//! Submit-control discovery.
//!
//! The strategies are tried in a fixed order and the first visible
//! match wins. A form with no discoverable submit control is left
//! unprocessed; that is an unreachable form, not an error.

use crate::driver::RawSubmitControl;

/// Class and value fragments that mark a control as a likely submitter.
const SUBMITTY_FRAGMENTS: &[&str] = &["submit", "send", "post", "comment", "btn-primary"];

/// Visible texts accepted by the last-resort text strategy.
const SUBMIT_TEXTS: &[&str] = &["submit", "send", "post", "comment", "go", "search"];

/// Apply the prioritized discovery cascade over a form's candidate
/// controls.
pub fn find_submit_control(controls: &[RawSubmitControl]) -> Option<&RawSubmitControl> {
    let visible = || controls.iter().filter(|c| c.visible);

    // input[type=submit]
    if let Some(c) = visible().find(|c| c.tag == "input" && c.input_type == "submit") {
        return Some(c);
    }

    // button[type=submit], including buttons with no explicit type
    // (the HTML default inside a form is submit).
    if let Some(c) = visible().find(|c| {
        c.tag == "button" && (c.input_type == "submit" || c.input_type.is_empty())
    }) {
        return Some(c);
    }

    // Common class/value patterns.
    if let Some(c) = visible().find(|c| {
        let class = c.css_class.to_lowercase();
        let value = c.value.to_lowercase();
        SUBMITTY_FRAGMENTS
            .iter()
            .any(|f| class.contains(f) || value.contains(f))
    }) {
        return Some(c);
    }

    // Text-based match.
    visible().find(|c| {
        let text = c.text.trim().to_lowercase();
        SUBMIT_TEXTS.iter().any(|t| text == *t || text.starts_with(t))
    })
}
