//! Form model, semantic classification, synthetic filling and
//! submission policy.

pub mod classify;
pub mod fill;
pub mod submit;

use crate::driver::{Locator, RawForm, RawInput};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Inferred semantic type of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    Login,
    Search,
    Contact,
    Registration,
    Transaction,
    Feedback,
    Unknown,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Login => "login",
            FormType::Search => "search",
            FormType::Contact => "contact",
            FormType::Registration => "registration",
            FormType::Transaction => "transaction",
            FormType::Feedback => "feedback",
            FormType::Unknown => "unknown",
        }
    }
}

/// A field of a discovered form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormInput {
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub required: bool,
    /// Runtime locator, re-resolved at interaction time.
    #[serde(skip)]
    pub locator: Locator,
    #[serde(skip)]
    pub tag: String,
    #[serde(skip)]
    pub options: Vec<String>,
    #[serde(skip)]
    pub checked: bool,
}

/// Structured representation of an HTML form plus its inferred
/// semantic type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub action: String,
    pub id: String,
    pub method: String,
    #[serde(rename = "formType")]
    pub form_type: FormType,
    /// Page the form was discovered on.
    pub url: String,
    pub inputs: Vec<FormInput>,
    /// Flips false -> true at most once, when a fill+submit attempt is
    /// made, regardless of whether the attempt succeeded.
    pub processed: bool,
}

impl FormDescriptor {
    /// Build a descriptor from a harvested form, classifying it in the
    /// process.
    pub fn from_raw(raw: &RawForm, page_url: &str) -> Self {
        let form_type = classify::classify(raw);
        Self {
            action: raw.action.clone(),
            id: raw.id.clone(),
            method: if raw.method.is_empty() {
                "get".to_string()
            } else {
                raw.method.to_lowercase()
            },
            form_type,
            url: page_url.to_string(),
            inputs: raw.inputs.iter().map(FormInput::from_raw).collect(),
            processed: false,
        }
    }

    /// Identity of the logical form across page revisits: action,
    /// method and the sorted set of input names.
    pub fn signature(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.action.hash(&mut hasher);
        self.method.hash(&mut hasher);
        let mut names: Vec<&str> = self.inputs.iter().map(|i| i.name.as_str()).collect();
        names.sort_unstable();
        for name in names {
            name.hash(&mut hasher);
        }
        hasher.finish()
    }

    pub fn has_password_field(&self) -> bool {
        self.inputs.iter().any(|i| i.input_type == "password")
    }
}

impl FormInput {
    fn from_raw(raw: &RawInput) -> Self {
        Self {
            input_type: if raw.input_type.is_empty() {
                "text".to_string()
            } else {
                raw.input_type.to_lowercase()
            },
            name: raw.name.clone(),
            id: raw.id.clone(),
            placeholder: raw.placeholder.clone(),
            required: raw.required,
            locator: raw.locator.clone(),
            tag: raw.tag.to_lowercase(),
            options: raw.options.clone(),
            checked: raw.checked,
        }
    }
}
