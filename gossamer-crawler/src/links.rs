//! Link harvesting, prioritization and the per-page follow queue.
//!
//! Anchors that resolve to an in-domain URL are deduplicated against
//! the visited-set up front. Interactive elements carry no stable URL
//! and are instead deduplicated by liveness at click time, since DOM
//! references do not survive across script executions.

use crate::driver::{Locator, RawClickable, RawLink};
use crate::normalize::{normalize_url, same_host};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Keywords that mark a link as security-sensitive; these links are
/// crawled before generic ones.
const SENSITIVE_KEYWORDS: &[&str] = &[
    "account", "login", "profile", "transfer", "register", "password", "admin", "setting",
    "feedback", "contact", "upload", "payment", "config",
];

/// Numeric id query parameters hint at IDOR-style endpoints.
static NUMERIC_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]\w*id=\d+").expect("static regex"));

/// How a candidate is acted upon when dequeued.
#[derive(Debug, Clone)]
pub enum CandidateKind {
    /// Navigable URL; normalized, recorded in the visited-set and
    /// recursed into.
    Navigate { url: String },
    /// Same-page hash anchor; clicked in place to trigger client-side
    /// UI state changes.
    HashAnchor { locator: Locator },
    /// `javascript:` href; the code is executed in place rather than
    /// navigated to.
    JsHref { locator: Locator, script: String },
    /// Clickable non-anchor element.
    Interactive { locator: Locator },
}

#[derive(Debug, Clone)]
pub struct LinkCandidate {
    pub kind: CandidateKind,
    pub text: String,
    pub priority: i32,
}

impl LinkCandidate {
    pub fn is_interactive(&self) -> bool {
        !matches!(self.kind, CandidateKind::Navigate { .. })
    }
}

/// Score a candidate by security-sensitivity of its text and target.
pub fn priority_score(text: &str, href: &str) -> i32 {
    let text = text.to_lowercase();
    let href = href.to_lowercase();
    let mut score = 0;

    for keyword in SENSITIVE_KEYWORDS {
        if text.contains(keyword) {
            score += 2;
        }
        if href.contains(keyword) {
            score += 2;
        }
    }
    if NUMERIC_ID_RE.is_match(&href) {
        score += 3;
    }
    if href.contains("file=") {
        score += 3;
    }
    score
}

/// Build the follow queue for one page: harvested anchors and
/// clickables filtered to in-domain unvisited targets, ordered
/// security-sensitive first, truncated to the per-page budget.
pub fn build_queue(
    links: &[RawLink],
    clickables: &[RawClickable],
    page_url: &str,
    visited: &HashSet<String>,
    max_links: usize,
) -> Vec<LinkCandidate> {
    let page = Url::parse(page_url).ok();
    let mut queued_urls: HashSet<String> = HashSet::new();
    let mut candidates: Vec<LinkCandidate> = Vec::new();

    for link in links {
        if !link.visible {
            continue;
        }
        let href = link.href.trim();
        if href.is_empty() || href.starts_with("mailto:") || href.starts_with("tel:") {
            continue;
        }

        if let Some(script) = href.strip_prefix("javascript:") {
            let script = script.trim();
            if script.is_empty() || script == "void(0)" || script == "void(0);" {
                continue;
            }
            candidates.push(LinkCandidate {
                kind: CandidateKind::JsHref {
                    locator: link.locator.clone(),
                    script: script.to_string(),
                },
                text: link.text.clone(),
                priority: priority_score(&link.text, href),
            });
            continue;
        }

        let resolved = match &page {
            Some(base) => match base.join(href) {
                Ok(u) => u,
                Err(_) => continue,
            },
            None => match Url::parse(href) {
                Ok(u) => u,
                Err(_) => continue,
            },
        };

        // A fragment pointing back into the current page is a UI
        // trigger, not a navigation target.
        if resolved.fragment().is_some() && is_same_document(&page, &resolved) {
            candidates.push(LinkCandidate {
                kind: CandidateKind::HashAnchor {
                    locator: link.locator.clone(),
                },
                text: link.text.clone(),
                priority: priority_score(&link.text, href),
            });
            continue;
        }

        let mut resolved = resolved;
        resolved.set_fragment(None);
        let absolute = resolved.to_string();

        if !same_host(page_url, &absolute) {
            continue;
        }
        let key = normalize_url(&absolute);
        if visited.contains(&key) || !queued_urls.insert(key) {
            continue;
        }

        candidates.push(LinkCandidate {
            kind: CandidateKind::Navigate {
                url: absolute.clone(),
            },
            text: link.text.clone(),
            priority: priority_score(&link.text, &absolute),
        });
    }

    for clickable in clickables {
        candidates.push(LinkCandidate {
            kind: CandidateKind::Interactive {
                locator: clickable.locator.clone(),
            },
            text: clickable.text.clone(),
            priority: priority_score(&clickable.text, ""),
        });
    }

    // Stable sort: prioritized first, document order within a score.
    candidates.sort_by_key(|c| -c.priority);
    candidates.truncate(max_links);
    candidates
}

fn is_same_document(page: &Option<Url>, target: &Url) -> bool {
    match page {
        Some(page) => {
            page.host_str() == target.host_str()
                && page.path() == target.path()
                && page.query() == target.query()
        }
        None => false,
    }
}
