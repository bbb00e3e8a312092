//! The terminal scan artifact consumed by UI and AI layers.

use crate::score::{MAX_SCORE, risk_score};
use gossamer_crawler::forms::FormDescriptor;
use gossamer_crawler::session::ScanSession;
use gossamer_crawler::visit::{Finding, LinkRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRating {
    pub score: u32,
    #[serde(rename = "maxScore")]
    pub max_score: u32,
}

/// Constructed once at scan completion from the session state; this
/// JSON shape is the external contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub url: String,
    #[serde(rename = "visitedUrls")]
    pub visited_urls: Vec<String>,
    pub findings: Vec<Finding>,
    pub forms: Vec<FormDescriptor>,
    pub links: Vec<LinkRecord>,
    #[serde(rename = "securityRating")]
    pub security_rating: SecurityRating,
    #[serde(rename = "scanCompletedAt")]
    pub scan_completed_at: String,
    /// Set only when the scan failed outright (browser did not start).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    pub fn from_session(session: &ScanSession) -> Self {
        // Links are recorded per page; the result carries each target
        // once.
        let mut seen = HashSet::new();
        let links: Vec<LinkRecord> = session
            .activity
            .iter()
            .flat_map(|visit| visit.links.iter())
            .filter(|link| seen.insert(link.url.clone()))
            .cloned()
            .collect();

        Self {
            url: session.seed_url.clone(),
            visited_urls: session.visited_urls().to_vec(),
            findings: session.findings.clone(),
            forms: session.forms.clone(),
            links,
            security_rating: SecurityRating {
                score: risk_score(&session.findings),
                max_score: MAX_SCORE,
            },
            scan_completed_at: chrono::Utc::now().to_rfc3339(),
            error: None,
        }
    }

    /// The mostly-empty result a fatal session failure is surfaced as.
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            visited_urls: Vec::new(),
            findings: Vec::new(),
            forms: Vec::new(),
            links: Vec::new(),
            security_rating: SecurityRating {
                score: MAX_SCORE,
                max_score: MAX_SCORE,
            },
            scan_completed_at: chrono::Utc::now().to_rfc3339(),
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
