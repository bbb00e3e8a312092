// Report generation from scan results

use crate::result::ScanResult;
use crate::score::risk_level;
use gossamer_crawler::visit::Severity;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn generate_text_report(result: &ScanResult) -> String {
    let mut report = String::new();

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                        GOSSAMER SECURITY SCAN REPORT\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    report.push_str(&format!("Target:        {}\n", result.url));
    report.push_str(&format!("Completed:     {}\n", result.scan_completed_at));
    if let Some(ref error) = result.error {
        report.push_str(&format!("Status:        FAILED ({error})\n"));
    }
    report.push_str(&format!("Pages Visited: {}\n", result.visited_urls.len()));
    report.push_str(&format!("Forms Found:   {}\n", result.forms.len()));
    report.push_str(&format!("Links Found:   {}\n", result.links.len()));
    report.push_str(&format!(
        "Security:      {}/{} (risk level: {})\n\n",
        result.security_rating.score,
        result.security_rating.max_score,
        risk_level(&result.findings)
    ));

    // Executive summary
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("EXECUTIVE SUMMARY\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    let highs = count_severity(result, Severity::High);
    let mediums = count_severity(result, Severity::Medium);
    let lows = count_severity(result, Severity::Low);

    report.push_str(&format!("Total Findings: {}\n\n", result.findings.len()));
    if highs > 0 {
        report.push_str(&format!("  [HIGH]   {highs}  (High priority)\n"));
    }
    if mediums > 0 {
        report.push_str(&format!("  [MEDIUM] {mediums}  (Should be addressed)\n"));
    }
    if lows > 0 {
        report.push_str(&format!("  [LOW]    {lows}  (Minor issues)\n"));
    }
    report.push('\n');

    // Detailed findings
    if !result.findings.is_empty() {
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        report.push_str("DETAILED FINDINGS\n");
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

        for (idx, finding) in result.findings.iter().enumerate() {
            report.push_str(&format!(
                "[{}] {}\n",
                idx + 1,
                format_finding_type(finding.kind.as_str())
            ));
            report.push_str(&format!("Severity:     {}\n", finding.severity.as_str().to_uppercase()));
            report.push_str(&format!("URL:          {}\n", finding.url));
            report.push_str("\nDescription:\n");
            report.push_str(&wrap_text(&finding.description, 80, "  "));
            report.push('\n');
            if let Some(ref evidence) = finding.evidence {
                report.push_str("Evidence:\n");
                report.push_str(&wrap_text(evidence, 80, "  "));
                report.push('\n');
            }
            report.push_str("────────────────────────────────────────────────────────────────────────────────\n\n");
        }
    }

    // Forms
    if !result.forms.is_empty() {
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        report.push_str("FORMS\n");
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
        for form in &result.forms {
            report.push_str(&format!(
                "  {:<13} {} field(s)  {}  {}\n",
                form.form_type.as_str(),
                form.inputs.len(),
                if form.processed { "submitted" } else { "not submitted" },
                form.url
            ));
        }
        report.push('\n');
    }

    // Visited pages
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("PAGES VISITED\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    for url in &result.visited_urls {
        report.push_str(&format!("  {url}\n"));
    }
    report.push('\n');

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                          End of Report\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("\nGenerated by Gossamer - a form-aware security crawler\n");
    report.push_str("For authorized security testing only.\n\n");

    report
}

pub fn generate_json_report(result: &ScanResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn count_severity(result: &ScanResult, severity: Severity) -> usize {
    result
        .findings
        .iter()
        .filter(|f| f.severity == severity)
        .count()
}

fn format_finding_type(finding_type: &str) -> String {
    finding_type
        .replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > width - indent.len() && !current_line.is_empty() {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }
        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}
