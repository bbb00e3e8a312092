//! The flattened summary handed to the external AI analysis layer.
//!
//! This is the only shape that layer is allowed to depend on.

use gossamer_crawler::forms::FormType;
use gossamer_crawler::session::ScanSession;
use gossamer_crawler::visit::{Finding, PageVisit, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many raw activity entries ride along as a sample.
const ACTIVITY_SAMPLE_LEN: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteOverview {
    pub url: String,
    pub title: String,
    pub total_pages_scanned: usize,
    pub total_forms: usize,
    pub total_links: usize,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub site_overview: SiteOverview,
    /// Form counts keyed by semantic type.
    pub form_summary: BTreeMap<String, usize>,
    /// Forms that handle credentials or personal data.
    pub security_forms: usize,
    /// Security-relevant forms served over plain HTTP.
    pub insecure_forms: usize,
    /// High and medium findings only.
    pub security_issues: Vec<Finding>,
    pub total_findings: usize,
    pub activity_sample: Vec<PageVisit>,
}

pub fn build_summary(session: &ScanSession) -> AnalysisSummary {
    let title = session
        .activity
        .first()
        .map(|v| v.title.clone())
        .unwrap_or_default();

    let mut form_summary: BTreeMap<String, usize> = BTreeMap::new();
    for form in &session.forms {
        *form_summary
            .entry(form.form_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    let security_forms: Vec<_> = session
        .forms
        .iter()
        .filter(|f| {
            f.form_type == FormType::Login
                || f.form_type == FormType::Registration
                || f.has_password_field()
        })
        .collect();
    let insecure_forms = security_forms
        .iter()
        .filter(|f| f.url.starts_with("http:"))
        .count();

    let security_issues: Vec<Finding> = session
        .findings
        .iter()
        .filter(|f| matches!(f.severity, Severity::High | Severity::Medium))
        .cloned()
        .collect();

    let total_links = session
        .activity
        .iter()
        .map(|v| v.links.len())
        .sum();

    AnalysisSummary {
        site_overview: SiteOverview {
            url: session.seed_url.clone(),
            title,
            total_pages_scanned: session.activity.len(),
            total_forms: session.forms.len(),
            total_links,
            findings: session.findings.clone(),
        },
        form_summary,
        security_forms: security_forms.len(),
        insecure_forms,
        security_issues,
        total_findings: session.findings.len(),
        activity_sample: session
            .activity
            .iter()
            .take(ACTIVITY_SAMPLE_LEN)
            .cloned()
            .collect(),
    }
}
