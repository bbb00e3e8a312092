//! The crawl orchestrator.
//!
//! Single-threaded, depth-first traversal over one browser session:
//! visit page -> detect and process forms -> follow links and
//! interactive elements -> run analyzers -> recurse within the depth
//! bound. Per-page failures are downgraded to logged findings; only a
//! browser that fails to start aborts a scan, and that happens before
//! the orchestrator ever runs.

use crate::analysis::{PageSnapshot, analyze_page};
use crate::driver::{PageDriver, RawForm, RawLink};
use crate::error::DriverError;
use crate::forms::{FormDescriptor, FormType, fill::fill_form, submit::find_submit_control};
use crate::headers::HeaderProbe;
use crate::links::{CandidateKind, build_queue};
use crate::normalize::{normalize_url, same_host};
use crate::rate_limit::RateLimiter;
use crate::session::{CrawlConfig, ScanSession};
use crate::visit::{Finding, FindingKind, LinkRecord, PageVisit, Severity};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Called once per page visit with the page URL.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives per-page screenshot bytes; persistence is the caller's
/// concern.
pub type ScreenshotSink = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Per-URL processing states. `Error` is reachable from any state and
/// transitions to `Done` with a recorded finding; it never halts the
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Queued,
    Loading,
    FormProcessing,
    LinkProcessing,
    Analyzing,
    Done,
    Error,
}

/// Selectors tried when dismissing a surfaced overlay.
const CLOSE_CONTROL_SELECTOR: &str =
    ".modal .close, .modal-close, .popup-close, [data-dismiss], [aria-label=\"Close\"], button.close";

pub struct Crawler<D: PageDriver> {
    driver: D,
    config: CrawlConfig,
    rate_limiter: RateLimiter,
    header_probe: Option<HeaderProbe>,
    progress: Option<ProgressCallback>,
    screenshots: Option<ScreenshotSink>,
}

impl<D: PageDriver> Crawler<D> {
    pub fn new(driver: D, config: CrawlConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit.clone());
        let header_probe = if config.probe_headers {
            HeaderProbe::new(config.page_load_timeout)
        } else {
            None
        };
        Self {
            driver,
            config,
            rate_limiter,
            header_probe,
            progress: None,
            screenshots: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_screenshot_sink(mut self, sink: ScreenshotSink) -> Self {
        self.screenshots = Some(sink);
        self
    }

    /// Crawl from the seed URL. Always returns the session; per-page
    /// errors are recorded as findings rather than propagated.
    pub fn run(mut self, seed_url: &str) -> ScanSession {
        info!(%seed_url, "starting crawl");
        let mut session = ScanSession::new(seed_url, self.config.scan_timeout);
        session.mark_visited(&normalize_url(seed_url));
        self.crawl_page(&mut session, seed_url, 0);
        info!(
            pages = session.activity.len(),
            findings = session.findings.len(),
            forms = session.forms.len(),
            elapsed = ?session.elapsed(),
            "crawl complete"
        );
        session
    }

    fn state(&self, url: &str, state: VisitState) {
        debug!(%url, ?state, "visit state");
    }

    /// Throttled navigation; the rate limiter runs before every
    /// navigation, including recursive descents and back-navigation.
    fn load(&mut self, url: &str) -> Result<(), DriverError> {
        self.rate_limiter.throttle(url);
        self.driver.navigate(url)?;
        self.driver.wait_until_ready(self.config.page_load_timeout)
    }

    /// Re-navigate to the page a branch started from, with one
    /// recovery retry. Failure abandons the branch but never the scan.
    fn return_to(&mut self, url: &str) {
        for attempt in 0..2 {
            match self.load(url) {
                Ok(()) => return,
                Err(e) => {
                    warn!(%url, attempt, error = %e, "failed to navigate back to origin");
                }
            }
        }
    }

    fn crawl_page(&mut self, session: &mut ScanSession, url: &str, depth: usize) {
        if session.out_of_time() {
            warn!(%url, "scan timeout reached, not visiting");
            return;
        }
        debug!(%url, depth, max_depth = self.config.max_depth, "crawling page");
        self.state(url, VisitState::Queued);
        if let Some(progress) = &self.progress {
            progress(url);
        }

        self.state(url, VisitState::Loading);
        let load_started = Instant::now();
        if let Err(e) = self.load(url) {
            self.state(url, VisitState::Error);
            warn!(%url, error = %e, "failed to load page");
            session.findings.push(
                Finding::new(
                    FindingKind::CrawlError,
                    url,
                    Severity::Low,
                    format!("Failed to crawl page: {e}"),
                )
                .with_evidence(format!("depth={depth}")),
            );
            self.state(url, VisitState::Done);
            return;
        }
        let load_time_ms = load_started.elapsed().as_millis() as u64;

        let title = self
            .driver
            .title()
            .unwrap_or_else(|_| "Unknown Title".to_string());
        let source = self.driver.page_source().unwrap_or_default();
        let headers = self
            .header_probe
            .as_ref()
            .and_then(|probe| probe.fetch(url));

        // Forms are harvested once per page, then processed in order.
        self.state(url, VisitState::FormProcessing);
        let raw_forms = self.driver.harvest_forms().unwrap_or_else(|e| {
            debug!(%url, error = %e, "form harvest failed");
            Vec::new()
        });
        let mut page_forms: Vec<FormDescriptor> = raw_forms
            .iter()
            .map(|raw| FormDescriptor::from_raw(raw, url))
            .collect();
        debug!(%url, forms = page_forms.len(), "detected forms");

        for (form, raw) in page_forms.iter_mut().zip(raw_forms.iter()) {
            self.process_form(session, form, raw, url, depth);
        }

        if self.config.check_iframes {
            let frame_forms = self.sweep_iframes(session, url);
            page_forms.extend(frame_forms);
        }

        // Links are followed only while another level of depth exists;
        // both bounds are enforced before any navigation happens.
        self.state(url, VisitState::LinkProcessing);
        let raw_links = self.driver.harvest_links().unwrap_or_else(|e| {
            debug!(%url, error = %e, "link harvest failed");
            Vec::new()
        });
        let page_links = internal_link_records(&raw_links, url);

        if depth < self.config.max_depth {
            let clickables = self.driver.harvest_clickables().unwrap_or_else(|e| {
                debug!(%url, error = %e, "clickable harvest failed");
                Vec::new()
            });
            let queue = build_queue(
                &raw_links,
                &clickables,
                url,
                session.visited_set(),
                self.config.max_links_per_page,
            );
            debug!(%url, queued = queue.len(), "following links");

            for candidate in queue {
                if session.out_of_time() {
                    warn!(%url, "scan timeout reached, abandoning remaining links");
                    break;
                }
                match candidate.kind {
                    CandidateKind::Navigate { url: target } => {
                        self.follow_link(session, url, &target, depth);
                    }
                    CandidateKind::HashAnchor { locator }
                    | CandidateKind::Interactive { locator } => {
                        self.follow_interactive(session, url, &locator, depth);
                    }
                    CandidateKind::JsHref { locator: _, script } => {
                        match self.driver.execute_script(&script) {
                            Ok(_) => {
                                self.driver.settle(self.config.settle_delay);
                                self.fold_in_navigation(session, url, depth);
                            }
                            Err(e) => debug!(%url, error = %e, "javascript href failed"),
                        }
                    }
                }
            }
        }

        self.state(url, VisitState::Analyzing);
        let snapshot = PageSnapshot {
            url,
            source: &source,
            headers: headers.as_ref(),
            forms: &page_forms,
        };
        let page_findings = analyze_page(&snapshot, self.config.extended_header_checks);
        session.findings.extend(page_findings.iter().cloned());

        if self.config.capture_screenshots
            && let Some(sink) = &self.screenshots
        {
            match self.driver.screenshot() {
                Ok(bytes) => sink(url, &bytes),
                Err(e) => debug!(%url, error = %e, "screenshot failed"),
            }
        }

        session.forms.extend(page_forms.iter().cloned());
        session.activity.push(PageVisit {
            url: url.to_string(),
            title,
            depth,
            links: page_links,
            forms: page_forms,
            findings: page_findings,
            load_time_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        self.state(url, VisitState::Done);
    }

    /// Fill and submit one form, folding the resulting page back into
    /// the traversal. The processed flag flips at most once per
    /// logical form across the whole session.
    fn process_form(
        &mut self,
        session: &mut ScanSession,
        form: &mut FormDescriptor,
        raw: &RawForm,
        page_url: &str,
        depth: usize,
    ) {
        let signature = form.signature();
        if session.form_already_processed(signature) {
            debug!(form_type = form.form_type.as_str(), "form already processed, skipping");
            return;
        }

        debug!(
            form_type = form.form_type.as_str(),
            fields = form.inputs.len(),
            "processing form"
        );
        let filled = fill_form(&mut self.driver, form);
        if filled == 0 {
            debug!("no fields filled, leaving form unsubmitted");
            return;
        }

        let submitted = match find_submit_control(&raw.submit_controls) {
            Some(control) => {
                session.mark_form_processed(signature);
                form.processed = true;
                match self.driver.click(&control.locator) {
                    Ok(true) => true,
                    Ok(false) => {
                        debug!("submit control no longer resolvable");
                        false
                    }
                    Err(e) => {
                        debug!(error = %e, "submit click failed");
                        false
                    }
                }
            }
            None if form.form_type == FormType::Search => {
                // Search forms often submit on Enter with no button.
                let target = form
                    .inputs
                    .iter()
                    .find(|i| i.input_type == "text" || i.input_type == "search");
                match target {
                    Some(field) => {
                        session.mark_form_processed(signature);
                        form.processed = true;
                        matches!(self.driver.submit_via_enter(&field.locator), Ok(true))
                    }
                    None => false,
                }
            }
            None => {
                // An unreachable form, not an error.
                debug!(
                    form_type = form.form_type.as_str(),
                    "no submit control found, leaving form unprocessed"
                );
                return;
            }
        };

        if !submitted {
            return;
        }

        self.driver.settle(self.config.settle_delay);
        self.fold_in_navigation(session, page_url, depth);
    }

    /// After a submission or in-page interaction, check whether the
    /// browser ended up on a new page; if so record it, recurse within
    /// the depth bound, and come back.
    fn fold_in_navigation(&mut self, session: &mut ScanSession, origin_url: &str, depth: usize) {
        let current = match self.driver.current_url() {
            Ok(u) => u,
            Err(e) => {
                debug!(error = %e, "could not read post-interaction URL");
                return;
            }
        };
        let key = normalize_url(&current);
        if key == normalize_url(origin_url) {
            return;
        }

        debug!(from = %origin_url, to = %current, "interaction navigated");
        if depth < self.config.max_depth && !session.is_visited(&key) {
            session.mark_visited(&key);
            self.crawl_page(session, &current, depth + 1);
        }
        self.return_to(origin_url);
    }

    /// Follow a URL-bearing candidate: mark visited before navigating,
    /// recurse, then return to the originating page.
    fn follow_link(&mut self, session: &mut ScanSession, origin_url: &str, target: &str, depth: usize) {
        let key = normalize_url(target);
        if !session.mark_visited(&key) {
            debug!(%target, "skipping already visited");
            return;
        }

        debug!(%target, "following link");
        self.crawl_page(session, target, depth + 1);
        self.return_to(origin_url);
    }

    /// Click an interactive candidate and sort out what happened:
    /// navigation, revealed UI, or nothing.
    fn follow_interactive(
        &mut self,
        session: &mut ScanSession,
        origin_url: &str,
        locator: &crate::driver::Locator,
        depth: usize,
    ) {
        // Liveness is the dedup criterion for interactive elements: a
        // locator that no longer resolves is a normal skip.
        let clicked = match self.driver.click(locator) {
            Ok(clicked) => clicked,
            Err(e) => {
                debug!(error = %e, "interactive click failed");
                return;
            }
        };
        if !clicked {
            debug!(css = %locator.css, index = locator.index, "interactive element gone, skipping");
            return;
        }

        self.driver.settle(self.config.settle_delay);

        let current = self.driver.current_url().unwrap_or_default();
        if !current.is_empty() && normalize_url(&current) != normalize_url(origin_url) {
            let key = normalize_url(&current);
            if same_host(origin_url, &current)
                && depth < self.config.max_depth
                && !session.is_visited(&key)
            {
                session.mark_visited(&key);
                self.crawl_page(session, &current, depth + 1);
            }
            self.return_to(origin_url);
            return;
        }

        if self.config.detect_revealed_content {
            self.process_revealed_content(session, origin_url, depth);
        }
    }

    /// After an in-page interaction, look for forms inside newly
    /// surfaced containers (modals, dropdowns, collapses, tab panels),
    /// process them, and optionally dismiss the surfaced UI.
    fn process_revealed_content(&mut self, session: &mut ScanSession, page_url: &str, depth: usize) {
        let raw_forms = match self.driver.harvest_forms() {
            Ok(forms) => forms,
            Err(e) => {
                debug!(error = %e, "post-interaction form harvest failed");
                return;
            }
        };
        let revealed: Vec<&RawForm> = raw_forms.iter().filter(|f| f.in_overlay).collect();
        if revealed.is_empty() {
            return;
        }
        debug!(count = revealed.len(), "forms revealed by interaction");

        for raw in revealed {
            let mut form = FormDescriptor::from_raw(raw, page_url);
            self.process_form(session, &mut form, raw, page_url, depth);
            session.forms.push(form);
        }

        if self.config.dismiss_revealed_ui {
            self.dismiss_overlay();
        }
    }

    fn dismiss_overlay(&mut self) {
        if let Ok(controls) = self.driver.find_elements(CLOSE_CONTROL_SELECTOR)
            && let Some(control) = controls.iter().find(|c| c.visible)
        {
            let _ = self.driver.click(&control.locator);
        }
        if let Err(e) = self.driver.send_escape() {
            debug!(error = %e, "escape dispatch failed");
        }
    }

    /// Sweep same-origin iframes for forms: switch into each frame,
    /// classify/fill/submit what it holds, and always switch back.
    fn sweep_iframes(&mut self, session: &mut ScanSession, page_url: &str) -> Vec<FormDescriptor> {
        let mut collected = Vec::new();
        let iframes = match self.driver.find_elements("iframe") {
            Ok(iframes) => iframes,
            Err(e) => {
                debug!(error = %e, "iframe discovery failed");
                return collected;
            }
        };
        if iframes.is_empty() {
            return collected;
        }
        debug!(count = iframes.len(), "found iframes");

        for (index, iframe) in iframes.iter().enumerate() {
            let raw_src = iframe.attr("src").unwrap_or_default().to_string();
            if raw_src.is_empty() || raw_src == "about:blank" || raw_src.starts_with("javascript:") {
                continue;
            }
            let src = Url::parse(page_url)
                .ok()
                .and_then(|base| base.join(&raw_src).ok())
                .map(|u| u.to_string())
                .unwrap_or(raw_src);
            if session.is_visited(&normalize_url(&src)) {
                continue;
            }

            if let Err(e) = self.driver.switch_to_frame(index) {
                debug!(%src, error = %e, "could not switch to iframe");
                continue;
            }

            let frame_forms = self.driver.harvest_forms().unwrap_or_default();
            for raw in &frame_forms {
                let mut form = FormDescriptor::from_raw(raw, &src);
                let signature = form.signature();
                if session.form_already_processed(signature) {
                    collected.push(form);
                    continue;
                }
                let filled = fill_form(&mut self.driver, &form);
                if filled > 0
                    && let Some(control) = find_submit_control(&raw.submit_controls)
                {
                    session.mark_form_processed(signature);
                    form.processed = true;
                    if matches!(self.driver.click(&control.locator), Ok(true)) {
                        self.driver.settle(self.config.settle_delay);
                    }
                }
                collected.push(form);
            }

            // Never strand the driver inside a frame.
            if let Err(e) = self.driver.switch_to_default() {
                warn!(%page_url, error = %e, "failed to leave iframe context");
            }
        }
        collected
    }
}

/// The in-domain links observed on a page, as recorded in its visit.
fn internal_link_records(links: &[RawLink], page_url: &str) -> Vec<LinkRecord> {
    let base = match Url::parse(page_url) {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    for link in links {
        if !link.visible {
            continue;
        }
        let href = link.href.trim();
        if href.is_empty()
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("javascript:")
        {
            continue;
        }
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        if resolved.host_str() != base.host_str() {
            continue;
        }
        let url = resolved.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }
        records.push(LinkRecord {
            url,
            text: link.text.trim().to_string(),
        });
    }
    records
}
