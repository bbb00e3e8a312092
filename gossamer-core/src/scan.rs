//! The scan entry point.
//!
//! `scan()` always resolves to a `ScanResult`: per-page problems are
//! findings, and a browser that fails to start is surfaced as a
//! failed result with the error flag set. The browser session is an
//! expensive OS-level process; it is owned by the driver and released
//! on drop no matter how the crawl ends.

use crate::result::ScanResult;
use crate::summary::{AnalysisSummary, build_summary};
use gossamer_crawler::chrome::ChromeDriver;
use gossamer_crawler::crawler::{Crawler, ProgressCallback, ScreenshotSink};
use gossamer_crawler::driver::PageDriver;
use gossamer_crawler::session::CrawlConfig;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_depth: usize,
    pub max_links_per_page: usize,
    pub timeout: Duration,
    /// Run the browser headless; turn off to watch a scan.
    pub headless: bool,
    pub capture_screenshots: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        let defaults = CrawlConfig::default();
        Self {
            max_depth: defaults.max_depth,
            max_links_per_page: defaults.max_links_per_page,
            timeout: defaults.scan_timeout,
            headless: true,
            capture_screenshots: false,
        }
    }
}

impl ScanOptions {
    fn crawl_config(&self) -> CrawlConfig {
        let mut config = CrawlConfig::default()
            .with_max_depth(self.max_depth)
            .with_max_links_per_page(self.max_links_per_page)
            .with_scan_timeout(self.timeout);
        config.capture_screenshots = self.capture_screenshots;
        config
    }
}

/// Scan a site. The returned future completes when the whole crawl is
/// done; the crawl itself runs on a blocking thread because the
/// browser surface is synchronous and single-focus.
pub async fn scan(url: &str, options: ScanOptions) -> ScanResult {
    let (result, _) = scan_session(url, options, None, None).await;
    result
}

/// Like [`scan`], also returning the flattened summary consumed by
/// the AI analysis layer.
pub async fn scan_session(
    url: &str,
    options: ScanOptions,
    progress: Option<ProgressCallback>,
    screenshots: Option<ScreenshotSink>,
) -> (ScanResult, AnalysisSummary) {
    let url = url.to_string();
    match tokio::task::spawn_blocking(move || {
        scan_blocking(&url, options, progress, screenshots)
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "scan task panicked");
            let result = ScanResult::failed("", format!("scan task failed: {e}"));
            let summary = empty_summary(&result);
            (result, summary)
        }
    }
}

fn scan_blocking(
    url: &str,
    options: ScanOptions,
    progress: Option<ProgressCallback>,
    screenshots: Option<ScreenshotSink>,
) -> (ScanResult, AnalysisSummary) {
    let config = options.crawl_config();
    let driver = match ChromeDriver::launch(options.headless) {
        Ok(driver) => driver.with_shadow_dom(config.detect_shadow_dom),
        Err(e) => {
            // The only fatal class: without a browser there is nothing
            // to crawl. There is no session to release.
            error!(error = %e, "browser session failed to start");
            let result = ScanResult::failed(url, e.to_string());
            let summary = empty_summary(&result);
            return (result, summary);
        }
    };

    run_scan(driver, url, config, progress, screenshots)
}

/// Drive a full scan over any page driver. The driver is consumed and
/// dropped here, which releases the underlying browser whether the
/// crawl succeeded or not.
pub fn run_scan<D: PageDriver>(
    driver: D,
    url: &str,
    config: CrawlConfig,
    progress: Option<ProgressCallback>,
    screenshots: Option<ScreenshotSink>,
) -> (ScanResult, AnalysisSummary) {
    let mut crawler = Crawler::new(driver, config);
    if let Some(progress) = progress {
        crawler = crawler.with_progress_callback(progress);
    }
    if let Some(sink) = screenshots {
        crawler = crawler.with_screenshot_sink(sink);
    }

    let session = crawler.run(url);
    info!(
        session = %session.id,
        pages = session.activity.len(),
        "assembling scan result"
    );
    let result = ScanResult::from_session(&session);
    let summary = build_summary(&session);
    (result, summary)
}

fn empty_summary(result: &ScanResult) -> AnalysisSummary {
    use crate::summary::SiteOverview;
    AnalysisSummary {
        site_overview: SiteOverview {
            url: result.url.clone(),
            title: String::new(),
            total_pages_scanned: 0,
            total_forms: 0,
            total_links: 0,
            findings: Vec::new(),
        },
        form_summary: Default::default(),
        security_forms: 0,
        insecure_forms: 0,
        security_issues: Vec::new(),
        total_findings: 0,
        activity_sample: Vec::new(),
    }
}
