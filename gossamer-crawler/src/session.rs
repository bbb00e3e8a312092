//! Scan configuration and the per-scan session state.

use crate::forms::FormDescriptor;
use crate::rate_limit::RateLimitConfig;
use crate::visit::{Finding, PageVisit};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Crawl behavior knobs. Built once per scan and immutable for the
/// session's lifetime; defaults mirror a cautious interactive scan.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Hard recursion ceiling.
    pub max_depth: usize,
    /// Per-page fan-out ceiling.
    pub max_links_per_page: usize,
    /// Wall-clock budget for the whole scan, polled between page
    /// visits.
    pub scan_timeout: Duration,
    /// How long to wait for a navigated page's document root.
    pub page_load_timeout: Duration,
    /// Settle delay after submissions and clicks.
    pub settle_delay: Duration,
    /// Sweep same-origin iframes for forms.
    pub check_iframes: bool,
    /// Pierce open shadow roots when harvesting the page.
    pub detect_shadow_dom: bool,
    /// Look for forms revealed by interactive clicks (modals,
    /// dropdowns, collapses, tabs).
    pub detect_revealed_content: bool,
    /// Try to dismiss surfaced overlays after processing them.
    pub dismiss_revealed_ui: bool,
    /// Capture a screenshot per visited page and hand it to the sink.
    pub capture_screenshots: bool,
    /// Fetch response headers out-of-band for the header analyzer.
    pub probe_headers: bool,
    /// Also check X-XSS-Protection, HSTS and Referrer-Policy.
    pub extended_header_checks: bool,
    pub rate_limit: RateLimitConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_links_per_page: 15,
            scan_timeout: Duration::from_secs(180),
            page_load_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
            check_iframes: true,
            detect_shadow_dom: true,
            detect_revealed_content: true,
            dismiss_revealed_ui: true,
            capture_screenshots: false,
            probe_headers: true,
            extended_header_checks: false,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl CrawlConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_links_per_page(mut self, max_links: usize) -> Self {
        self.max_links_per_page = max_links;
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// The mutable state of one scan: visited-set, finding list, form
/// list and activity log, owned here and only ever touched by the
/// single orchestrating thread.
pub struct ScanSession {
    pub id: Uuid,
    pub seed_url: String,
    /// Normalized URL keys. A key, once present, is never revisited.
    visited: HashSet<String>,
    /// Insertion-ordered copy of the visited keys, for reporting.
    visited_order: Vec<String>,
    pub findings: Vec<Finding>,
    pub forms: Vec<FormDescriptor>,
    /// Signatures of logical forms a fill+submit was already attempted
    /// for, preventing duplicate submission on retraversal.
    processed_forms: HashSet<u64>,
    pub activity: Vec<PageVisit>,
    started: Instant,
    deadline: Instant,
}

impl ScanSession {
    pub fn new(seed_url: &str, scan_timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            id: Uuid::new_v4(),
            seed_url: seed_url.to_string(),
            visited: HashSet::new(),
            visited_order: Vec::new(),
            findings: Vec::new(),
            forms: Vec::new(),
            processed_forms: HashSet::new(),
            activity: Vec::new(),
            started,
            deadline: started + scan_timeout,
        }
    }

    /// Check-then-insert for the visited-set. Returns true when the
    /// key was new. Keys must already be normalized.
    pub fn mark_visited(&mut self, normalized: &str) -> bool {
        if self.visited.insert(normalized.to_string()) {
            self.visited_order.push(normalized.to_string());
            true
        } else {
            false
        }
    }

    pub fn is_visited(&self, normalized: &str) -> bool {
        self.visited.contains(normalized)
    }

    pub fn visited_set(&self) -> &HashSet<String> {
        &self.visited
    }

    pub fn visited_urls(&self) -> &[String] {
        &self.visited_order
    }

    /// Record that a fill+submit was attempted for a logical form.
    /// Returns false when this form was already attempted.
    pub fn mark_form_processed(&mut self, signature: u64) -> bool {
        self.processed_forms.insert(signature)
    }

    pub fn form_already_processed(&self, signature: u64) -> bool {
        self.processed_forms.contains(&signature)
    }

    pub fn out_of_time(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
