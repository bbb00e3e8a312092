use clap::ArgMatches;
use colored::Colorize;
use gossamer_core::report::{ReportFormat, generate_json_report, generate_text_report, save_report};
use gossamer_core::scan::{ScanOptions, scan_session};
use gossamer_core::ScanResult;
use gossamer_core::summary::AnalysisSummary;
use gossamer_crawler::crawler::{ProgressCallback, ScreenshotSink};
use gossamer_crawler::visit::Severity;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub async fn handle_scan(sub_matches: &ArgMatches) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let url = sub_matches.get_one::<Url>("url").expect("url is required");
    let max_depth = *sub_matches.get_one::<usize>("max-depth").unwrap_or(&5);
    let max_links = *sub_matches.get_one::<usize>("max-links").unwrap_or(&15);
    let timeout_secs = *sub_matches.get_one::<u64>("timeout").unwrap_or(&180);
    let headed = sub_matches.get_flag("headed");
    let screenshots_dir = sub_matches.get_one::<PathBuf>("screenshots").cloned();
    let output = sub_matches.get_one::<String>("output");
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let want_summary = sub_matches.get_flag("summary");

    println!("\n🕸  Scanning {}", url.as_str().bright_white());
    println!("Max depth: {max_depth}");
    println!("Max links per page: {max_links}");
    println!("Timeout: {timeout_secs}s");
    println!("Browser: {}\n", if headed { "headed" } else { "headless" });

    let options = ScanOptions {
        max_depth,
        max_links_per_page: max_links,
        timeout: Duration::from_secs(timeout_secs),
        headless: !headed,
        capture_screenshots: screenshots_dir.is_some(),
    };

    // Spinner fed by the per-page progress callback.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("static template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Starting browser...");

    let pages = Arc::new(AtomicUsize::new(0));
    let progress: ProgressCallback = {
        let spinner = spinner.clone();
        let pages = pages.clone();
        Arc::new(move |url: &str| {
            let count = pages.fetch_add(1, Ordering::Relaxed) + 1;
            spinner.set_message(format!("[{count}] {url}"));
        })
    };

    let screenshot_sink: Option<ScreenshotSink> = screenshots_dir.map(|dir| {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("✗ could not create screenshot directory: {e}");
        }
        let counter = AtomicUsize::new(0);
        Arc::new(move |_url: &str, bytes: &[u8]| {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            let path = dir.join(format!("page_{n:03}.png"));
            if let Err(e) = std::fs::write(&path, bytes) {
                eprintln!("✗ could not write screenshot {}: {e}", path.display());
            }
        }) as ScreenshotSink
    });

    let (result, summary) =
        scan_session(url.as_str(), options, Some(progress), screenshot_sink).await;

    spinner.finish_and_clear();

    if let Some(ref error) = result.error {
        eprintln!("{} Scan failed: {}", "✗".red().bold(), error);
    } else {
        println!("{} Scan complete!\n", "✓".green().bold());
    }

    print_result_summary(&result);

    match output {
        Some(path) => {
            let expanded = shellexpand::tilde(path);
            let path = Path::new(expanded.as_ref());
            let content = match render_report(&result, &format) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("{} Failed to render report: {}", "✗".red().bold(), e);
                    std::process::exit(1);
                }
            };
            match save_report(&content, path) {
                Ok(()) => println!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                ),
                Err(e) => {
                    eprintln!("{} Failed to save report: {}", "✗".red().bold(), e);
                    std::process::exit(1);
                }
            }
        }
        None => match render_report(&result, &format) {
            Ok(content) => print!("{content}"),
            Err(e) => eprintln!("{} Failed to render report: {}", "✗".red().bold(), e),
        },
    }

    if want_summary {
        print_analysis_summary(&summary);
    }

    if result.is_failed() {
        std::process::exit(1);
    }
}

fn render_report(result: &ScanResult, format: &ReportFormat) -> Result<String, String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(result)),
        ReportFormat::Json => generate_json_report(result).map_err(|e| e.to_string()),
    }
}

fn print_result_summary(result: &ScanResult) {
    let highs = severity_count(result, Severity::High);
    let mediums = severity_count(result, Severity::Medium);
    let lows = severity_count(result, Severity::Low);

    println!("  Pages visited:  {}", result.visited_urls.len());
    println!("  Forms found:    {}", result.forms.len());
    println!("  Links found:    {}", result.links.len());
    println!(
        "  Security score: {}/{}",
        score_colored(result).bold(),
        result.security_rating.max_score
    );
    if highs > 0 {
        println!("  {} high severity finding(s)", highs.to_string().red().bold());
    }
    if mediums > 0 {
        println!("  {} medium severity finding(s)", mediums.to_string().yellow());
    }
    if lows > 0 {
        println!("  {} low severity finding(s)", lows);
    }
    println!();
}

fn score_colored(result: &ScanResult) -> colored::ColoredString {
    let score = result.security_rating.score;
    let text = score.to_string();
    match score {
        0..=40 => text.red(),
        41..=70 => text.yellow(),
        _ => text.green(),
    }
}

fn severity_count(result: &ScanResult, severity: Severity) -> usize {
    result
        .findings
        .iter()
        .filter(|f| f.severity == severity)
        .count()
}

fn print_analysis_summary(summary: &AnalysisSummary) {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("✗ Failed to serialize analysis summary: {e}"),
    }
}

/// Parse a command-line URL argument, trying to add http:// if needed.
pub fn parse_url_line(line: &str) -> Option<String> {
    // Try to parse as-is
    if Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    // Try adding http://
    let with_scheme = format!("http://{line}");
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Skipping invalid URL '{line}'");
    None
}
