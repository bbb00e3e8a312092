//! Records produced by the crawl: findings, link records and the
//! per-page activity log entries.

use crate::forms::FormDescriptor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    InsecureConnection,
    InsecureLogin,
    MissingCsp,
    MissingXFrameOptions,
    MissingXssProtection,
    MissingHsts,
    MissingReferrerPolicy,
    SensitiveDataExposure,
    VulnerableLibrary,
    InputValidation,
    AutocompleteEnabled,
    ReflectedParameters,
    CrawlError,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::InsecureConnection => "insecure_connection",
            FindingKind::InsecureLogin => "insecure_login",
            FindingKind::MissingCsp => "missing_csp",
            FindingKind::MissingXFrameOptions => "missing_x_frame_options",
            FindingKind::MissingXssProtection => "missing_xss_protection",
            FindingKind::MissingHsts => "missing_hsts",
            FindingKind::MissingReferrerPolicy => "missing_referrer_policy",
            FindingKind::SensitiveDataExposure => "sensitive_data_exposure",
            FindingKind::VulnerableLibrary => "vulnerable_library",
            FindingKind::InputValidation => "input_validation",
            FindingKind::AutocompleteEnabled => "autocomplete_enabled",
            FindingKind::ReflectedParameters => "reflected_parameters",
            FindingKind::CrawlError => "crawl_error",
        }
    }
}

/// A single detected security-relevant condition. Append-only and
/// immutable once created; owned by the session's finding list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub url: String,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Finding {
    pub fn new(
        kind: FindingKind,
        url: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            url: url.into(),
            severity,
            description: description.into(),
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// A link observed on a page, as recorded in the scan result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub text: String,
}

/// One crawled page. Created once per visit, appended to the session's
/// activity log, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVisit {
    pub url: String,
    pub title: String,
    pub depth: usize,
    pub links: Vec<LinkRecord>,
    pub forms: Vec<FormDescriptor>,
    pub findings: Vec<Finding>,
    pub load_time_ms: u64,
    pub timestamp: String,
}
