//! Semantic form classification.
//!
//! An ordered list of `(FormType, predicate)` rules evaluated in a
//! single pass, first match wins. The ordering encodes real-world
//! precedence: a form with both a password field and a search box is a
//! login form, not a search form.

use super::FormType;
use crate::driver::RawForm;

/// Lowercased views of the attributes the rules match against.
struct Signals {
    /// action + id + class of the form element itself.
    meta: String,
    /// (type, name+id, placeholder) per input, all lowercased.
    inputs: Vec<(String, String, String)>,
    has_textarea: bool,
    input_count: usize,
}

impl Signals {
    fn from_raw(form: &RawForm) -> Self {
        let meta = format!("{} {} {}", form.action, form.id, form.css_class).to_lowercase();
        let inputs: Vec<(String, String, String)> = form
            .inputs
            .iter()
            .map(|i| {
                (
                    i.input_type.to_lowercase(),
                    format!("{} {}", i.name, i.id).to_lowercase(),
                    i.placeholder.to_lowercase(),
                )
            })
            .collect();
        let has_textarea = form.inputs.iter().any(|i| i.tag.eq_ignore_ascii_case("textarea"));
        let input_count = inputs.len();
        Self {
            meta,
            inputs,
            has_textarea,
            input_count,
        }
    }

    fn any_type(&self, t: &str) -> bool {
        self.inputs.iter().any(|(ty, _, _)| ty == t)
    }

    fn any_name(&self, needles: &[&str]) -> bool {
        self.inputs
            .iter()
            .any(|(_, name, _)| needles.iter().any(|n| name.contains(n)))
    }

    /// Exact-name match against the whitespace-separated name/id field.
    fn any_name_exact(&self, needles: &[&str]) -> bool {
        self.inputs
            .iter()
            .any(|(_, name, _)| name.split_whitespace().any(|w| needles.contains(&w)))
    }

    fn meta_contains(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.meta.contains(n))
    }

    fn has_email_field(&self) -> bool {
        self.any_type("email") || self.any_name(&["email", "mail"])
    }
}

/// The precedence policy as data: evaluated top to bottom, first
/// matching rule labels the form.
const RULES: &[(FormType, fn(&Signals) -> bool)] = &[
    (FormType::Login, |s| s.any_type("password")),
    (FormType::Search, |s| {
        s.meta_contains(&["search"]) || s.any_name_exact(&["query", "q", "search"])
    }),
    (FormType::Contact, |s| {
        s.has_email_field() && (s.any_name(&["message", "comment"]) || s.meta_contains(&["contact"]))
    }),
    (FormType::Registration, |s| {
        s.input_count > 2
            && s.has_email_field()
            && s.meta_contains(&["register", "signup", "sign-up", "sign_up", "join"])
    }),
    (FormType::Transaction, |s| {
        s.meta_contains(&["transfer", "payment", "checkout", "billing", "transaction"])
            || s.any_name(&["amount", "account", "transfer"])
    }),
    (FormType::Feedback, |s| {
        s.any_name(&["comment", "feedback", "subject", "question"])
            || (s.has_textarea && s.input_count >= 2)
            || (s.has_textarea && (s.has_email_field() || s.any_name(&["name"])))
    }),
];

pub fn classify(form: &RawForm) -> FormType {
    let signals = Signals::from_raw(form);
    for (form_type, matches) in RULES {
        if matches(&signals) {
            return *form_type;
        }
    }
    FormType::Unknown
}
