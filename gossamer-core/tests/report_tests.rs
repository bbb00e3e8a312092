// Tests for report rendering and saving

use gossamer_core::report::{
    ReportFormat, generate_json_report, generate_text_report, save_report,
};
use gossamer_core::result::{ScanResult, SecurityRating};
use gossamer_crawler::forms::{FormDescriptor, FormInput, FormType};
use gossamer_crawler::visit::{Finding, FindingKind, LinkRecord, Severity};

fn sample_result() -> ScanResult {
    ScanResult {
        url: "http://demo.example/".to_string(),
        visited_urls: vec!["demo.example".to_string(), "demo.example/login".to_string()],
        findings: vec![
            Finding::new(
                FindingKind::InsecureConnection,
                "http://demo.example/",
                Severity::High,
                "Page uses insecure HTTP instead of HTTPS",
            ),
            Finding::new(
                FindingKind::MissingCsp,
                "http://demo.example/",
                Severity::Medium,
                "Content-Security-Policy header not detected",
            )
            .with_evidence("probe"),
        ],
        forms: vec![FormDescriptor {
            action: "/doLogin".to_string(),
            id: "login".to_string(),
            method: "post".to_string(),
            form_type: FormType::Login,
            url: "http://demo.example/login".to_string(),
            inputs: vec![FormInput {
                input_type: "password".to_string(),
                name: "passw".to_string(),
                ..Default::default()
            }],
            processed: true,
        }],
        links: vec![LinkRecord {
            url: "http://demo.example/login".to_string(),
            text: "Sign in".to_string(),
        }],
        security_rating: SecurityRating {
            score: 78,
            max_score: 100,
        },
        scan_completed_at: "2026-01-15T12:00:00+00:00".to_string(),
        error: None,
    }
}

#[test]
fn text_report_contains_the_scan_facts() {
    let report = generate_text_report(&sample_result());

    assert!(report.contains("GOSSAMER SECURITY SCAN REPORT"));
    assert!(report.contains("http://demo.example/"));
    assert!(report.contains("Pages Visited: 2"));
    assert!(report.contains("78/100"));
    assert!(report.contains("Insecure Connection"));
    assert!(report.contains("Missing Csp"));
    assert!(report.contains("[HIGH]"));
    assert!(report.contains("[MEDIUM]"));
    assert!(report.contains("login"));
    assert!(report.contains("submitted"));
}

#[test]
fn text_report_marks_failed_scans() {
    let result = ScanResult::failed("http://demo.example/", "chrome launch: no binary");
    let report = generate_text_report(&result);
    assert!(report.contains("FAILED"));
    assert!(report.contains("chrome launch: no binary"));
}

#[test]
fn json_report_has_the_contract_shape() {
    let json = generate_json_report(&sample_result()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["url"], "http://demo.example/");
    assert!(value["visitedUrls"].is_array());
    assert_eq!(value["visitedUrls"].as_array().unwrap().len(), 2);
    assert_eq!(value["securityRating"]["score"], 78);
    assert_eq!(value["securityRating"]["maxScore"], 100);
    assert!(value["scanCompletedAt"].is_string());
    assert_eq!(value["findings"][0]["type"], "insecure_connection");
    assert_eq!(value["findings"][0]["severity"], "high");
    assert_eq!(value["forms"][0]["formType"], "login");
    // A successful scan serializes no error member at all.
    assert!(value.get("error").is_none());
}

#[test]
fn json_report_round_trips() {
    let json = generate_json_report(&sample_result()).unwrap();
    let parsed: ScanResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.visited_urls.len(), 2);
    assert_eq!(parsed.findings.len(), 2);
    assert_eq!(parsed.security_rating.score, 78);
}

#[test]
fn report_format_parsing() {
    assert!(matches!(ReportFormat::from_str("text"), Some(ReportFormat::Text)));
    assert!(matches!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json)));
    assert!(ReportFormat::from_str("csv").is_none());
}

#[test]
fn save_report_writes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.txt");

    let report = generate_text_report(&sample_result());
    save_report(&report, &path).unwrap();

    let read_back = std::fs::read_to_string(&path).unwrap();
    assert_eq!(read_back, report);
}
