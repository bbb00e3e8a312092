//! Synthetic value selection and field filling.
//!
//! Values come from a fixed pattern table matched against a field's
//! name, id and placeholder, with input-type fallbacks for anything
//! the table misses. Select elements get a contextual choice. Every
//! driver failure is caught per field and counts as "not filled".

use super::{FormDescriptor, FormInput};
use crate::driver::PageDriver;
use rand::Rng;
use tracing::debug;

/// Ordered pattern table: first match against name/id/placeholder
/// wins, so the more specific patterns come first.
const FILL_PATTERNS: &[(&str, &str)] = &[
    ("email", "test@example.com"),
    ("e-mail", "test@example.com"),
    ("username", "testuser"),
    ("firstname", "Test"),
    ("first_name", "Test"),
    ("first-name", "Test"),
    ("lastname", "User"),
    ("last_name", "User"),
    ("last-name", "User"),
    ("pass", "password123"),
    ("phone", "1234567890"),
    ("mobile", "1234567890"),
    ("address", "123 Test St"),
    ("city", "Testville"),
    ("zip", "12345"),
    ("postal", "12345"),
    ("search", "security test"),
    ("query", "security test"),
    ("comment", "This is an automated security test"),
    ("message", "This is an automated security test"),
    ("subject", "Automated security test"),
    ("question", "Is this site secure?"),
    ("amount", "100"),
    ("account", "800001"),
    ("user", "testuser"),
    ("name", "Test User"),
];

/// Input types that are never filled.
const SKIPPED_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image", "file"];

/// Pick a synthetic value for a text-like input, or `None` when no
/// sensible value exists.
pub fn synthetic_value(input: &FormInput) -> Option<&'static str> {
    let haystack = format!("{} {} {}", input.name, input.id, input.placeholder).to_lowercase();
    for (pattern, value) in FILL_PATTERNS {
        if haystack.contains(pattern) {
            return Some(value);
        }
    }

    match input.input_type.as_str() {
        "email" => Some("test@example.com"),
        "password" => Some("password123"),
        "tel" => Some("1234567890"),
        "number" => Some("42"),
        "url" => Some("https://example.com"),
        "date" => Some("2024-01-15"),
        "text" | "textarea" => Some("test_value"),
        _ => None,
    }
}

/// True for option texts that are placeholders, not real choices.
fn is_placeholder_option(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    t.is_empty()
        || t.starts_with("--")
        || t.contains("select")
        || t.contains("choose")
        || t.contains("pick")
}

/// Contextual choice for a `<select>`: returns the option index to
/// pick, or `None` if every option looks like a placeholder.
pub fn choose_option(input: &FormInput) -> Option<usize> {
    let options = &input.options;
    if options.is_empty() {
        return None;
    }
    let purpose = format!("{} {}", input.name, input.id).to_lowercase();

    let prefer = |needles: &[&str]| -> Option<usize> {
        options.iter().position(|o| {
            let o = o.to_lowercase();
            needles.iter().any(|n| o.contains(n))
        })
    };
    let first_real = || options.iter().position(|o| !is_placeholder_option(o));

    if purpose.contains("country") {
        return prefer(&["united states", "usa"]).or_else(first_real);
    }
    if purpose.contains("state") {
        return prefer(&["california", "new york", "texas"]).or_else(first_real);
    }
    if purpose.contains("month") {
        // Index 0 is almost always the "Month" placeholder.
        return options
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, o)| !is_placeholder_option(o))
            .map(|(i, _)| i);
    }
    if purpose.contains("gender") {
        let real: Vec<usize> = options
            .iter()
            .enumerate()
            .filter(|(_, o)| !is_placeholder_option(o))
            .map(|(i, _)| i)
            .collect();
        if real.is_empty() {
            return None;
        }
        return Some(real[rand::thread_rng().gen_range(0..real.len())]);
    }

    first_real()
}

/// Fill every fillable field of a classified form through the driver.
/// Returns the number of fields successfully committed; a zero return
/// means the form must be left unsubmitted.
pub fn fill_form<D: PageDriver + ?Sized>(driver: &mut D, form: &FormDescriptor) -> usize {
    let mut filled = 0;

    for input in &form.inputs {
        if SKIPPED_TYPES.contains(&input.input_type.as_str()) {
            continue;
        }

        let committed = match (input.tag.as_str(), input.input_type.as_str()) {
            ("select", _) => match choose_option(input) {
                Some(idx) => driver.select_by_index(&input.locator, idx),
                None => Ok(false),
            },
            (_, "checkbox") => {
                if input.checked {
                    Ok(false)
                } else {
                    driver.set_checked(&input.locator, true)
                }
            }
            (_, "radio") => driver.click(&input.locator),
            _ => match synthetic_value(input) {
                Some(value) => driver.fill(&input.locator, value),
                None => Ok(false),
            },
        };

        match committed {
            Ok(true) => filled += 1,
            Ok(false) => {}
            Err(e) => {
                debug!(field = %input.name, error = %e, "failed to fill field, skipping");
            }
        }
    }

    filled
}
