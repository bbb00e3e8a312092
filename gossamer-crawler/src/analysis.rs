//! Passive security checks run once per visited page.
//!
//! Each check is independent and order-insensitive: it inspects a
//! captured [`PageSnapshot`] and appends zero or more findings. A
//! check that cannot run (no probed headers, unparseable URL) emits
//! nothing; it never aborts the page visit.

use crate::forms::{FormDescriptor, FormType};
use crate::visit::{Finding, FindingKind, Severity};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

/// Everything the analyzers may look at for one page.
pub struct PageSnapshot<'a> {
    pub url: &'a str,
    pub source: &'a str,
    /// Response headers from the out-of-band probe, lowercased keys.
    /// `None` when the probe is disabled or failed.
    pub headers: Option<&'a HashMap<String, String>>,
    pub forms: &'a [FormDescriptor],
}

/// Run every analyzer over a page snapshot.
pub fn analyze_page(snapshot: &PageSnapshot, extended_headers: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(check_transport(snapshot));
    findings.extend(check_security_headers(snapshot, extended_headers));
    findings.extend(check_sensitive_data(snapshot));
    findings.extend(check_vulnerable_libraries(snapshot));
    findings.extend(check_input_validation(snapshot));
    findings.extend(check_autocomplete(snapshot));
    findings.extend(check_reflected_parameters(snapshot));
    findings
}

/// Plain HTTP, and the compounding case of a login form served over it.
pub fn check_transport(snapshot: &PageSnapshot) -> Vec<Finding> {
    let mut findings = Vec::new();

    let parsed = match Url::parse(snapshot.url) {
        Ok(u) => u,
        Err(_) => return findings,
    };
    if parsed.scheme() != "http" {
        return findings;
    }
    // Loopback rigs are not worth flagging.
    if let Some(host) = parsed.host_str()
        && (host == "localhost" || host.starts_with("127."))
    {
        return findings;
    }

    findings.push(Finding::new(
        FindingKind::InsecureConnection,
        snapshot.url,
        Severity::High,
        "Page uses insecure HTTP instead of HTTPS",
    ));

    if snapshot.forms.iter().any(|f| f.form_type == FormType::Login) {
        findings.push(Finding::new(
            FindingKind::InsecureLogin,
            snapshot.url,
            Severity::High,
            "Login form found on non-HTTPS page",
        ));
    }

    findings
}

struct HeaderCheck {
    name: &'static str,
    aliases: &'static [&'static str],
    kind: FindingKind,
    extended: bool,
}

/// Equivalent header names are aliased so one protection is never
/// flagged twice.
const HEADER_CHECKS: &[HeaderCheck] = &[
    HeaderCheck {
        name: "content-security-policy",
        aliases: &["csp", "content-security-policy-report-only"],
        kind: FindingKind::MissingCsp,
        extended: false,
    },
    HeaderCheck {
        name: "x-frame-options",
        aliases: &["x-frame"],
        kind: FindingKind::MissingXFrameOptions,
        extended: false,
    },
    HeaderCheck {
        name: "x-xss-protection",
        aliases: &["x-xss"],
        kind: FindingKind::MissingXssProtection,
        extended: true,
    },
    HeaderCheck {
        name: "strict-transport-security",
        aliases: &["hsts"],
        kind: FindingKind::MissingHsts,
        extended: true,
    },
    HeaderCheck {
        name: "referrer-policy",
        aliases: &[],
        kind: FindingKind::MissingReferrerPolicy,
        extended: true,
    },
];

/// Missing security headers, from the probed response headers plus the
/// `<meta http-equiv>` escape hatch for CSP.
pub fn check_security_headers(snapshot: &PageSnapshot, extended: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let headers = match snapshot.headers {
        Some(h) => h,
        None => return findings,
    };

    let source_lower = snapshot.source.to_lowercase();
    let has_meta_csp = source_lower.contains("http-equiv=\"content-security-policy\"")
        || source_lower.contains("http-equiv='content-security-policy'");

    for check in HEADER_CHECKS {
        if check.extended && !extended {
            continue;
        }
        let present = headers
            .keys()
            .any(|k| k == check.name || check.aliases.contains(&k.as_str()));
        if present {
            continue;
        }
        if check.kind == FindingKind::MissingCsp && has_meta_csp {
            continue;
        }
        findings.push(Finding::new(
            check.kind,
            snapshot.url,
            Severity::Medium,
            format!(
                "{} header not detected",
                display_header_name(check.name)
            ),
        ));
    }

    findings
}

fn display_header_name(lower: &str) -> String {
    lower
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

static SENSITIVE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r#"password\s*=\s*['"][^'"]+['"]"#, "hardcoded password"),
        (r#"api[_\s]*key\s*=\s*['"][^'"]+['"]"#, "exposed API key"),
        (r#"secret\s*=\s*['"][^'"]+['"]"#, "exposed secret"),
        (r#"token\s*=\s*['"][^'"]+['"]"#, "exposed token"),
        (r#"['"]AIza[0-9A-Za-z_-]{35}['"]"#, "Google API key"),
        (r#"['"]sk_live_[0-9a-zA-Z]{24}['"]"#, "Stripe live key"),
        (r#"['"]AKIA[0-9A-Z]{16}['"]"#, "AWS access key"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("static regex"), label))
    .collect()
});

/// Hardcoded credentials and vendor key formats in page content.
pub fn check_sensitive_data(snapshot: &PageSnapshot) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (regex, label) in SENSITIVE_PATTERNS.iter() {
        if regex.is_match(snapshot.source) {
            findings.push(
                Finding::new(
                    FindingKind::SensitiveDataExposure,
                    snapshot.url,
                    Severity::High,
                    format!("Potential {label} found in page content"),
                )
                .with_evidence(label.to_string()),
            );
        }
    }
    findings
}

static LIBRARY_PATTERNS: LazyLock<Vec<(Regex, &'static str, Severity)>> = LazyLock::new(|| {
    [
        (r"jquery[.-]1\.\d+\.\d+", "jQuery 1.x", Severity::Medium),
        (r"jquery[.-]2\.[0-4]", "jQuery < 2.5", Severity::Medium),
        (r"angular[.-]1\.[0-5]", "Angular 1.x < 1.6", Severity::Medium),
        (r"bootstrap[.-]2\.", "Bootstrap 2.x", Severity::Low),
        (r"react[.-]0\.", "React 0.x", Severity::Medium),
    ]
    .into_iter()
    .map(|(pattern, name, severity)| {
        (
            Regex::new(&format!("(?i){pattern}")).expect("static regex"),
            name,
            severity,
        )
    })
    .collect()
});

/// Known-old versions of common JavaScript libraries.
pub fn check_vulnerable_libraries(snapshot: &PageSnapshot) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (regex, name, severity) in LIBRARY_PATTERNS.iter() {
        if regex.is_match(snapshot.source) {
            findings.push(
                Finding::new(
                    FindingKind::VulnerableLibrary,
                    snapshot.url,
                    *severity,
                    format!("Potentially vulnerable version of {name} detected"),
                )
                .with_evidence(name.to_string()),
            );
        }
    }
    findings
}

static XSS_VECTORS: LazyLock<Vec<(Regex, &'static str, Severity)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r#"<input[^>]*value\s*=\s*["'][^"']*\$\{"#).expect("static regex"),
            "template-interpolated attribute value",
            Severity::High,
        ),
        (
            Regex::new(r"document\.write\s*\(").expect("static regex"),
            "document.write usage",
            Severity::Medium,
        ),
        (
            Regex::new(r"\beval\s*\(").expect("static regex"),
            "eval usage",
            Severity::High,
        ),
    ]
});

/// Heuristic XSS vectors in page content.
pub fn check_input_validation(snapshot: &PageSnapshot) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (regex, label, severity) in XSS_VECTORS.iter() {
        if regex.is_match(snapshot.source) {
            findings.push(Finding::new(
                FindingKind::InputValidation,
                snapshot.url,
                *severity,
                format!("Potential XSS vector: {label}"),
            ));
        }
    }
    findings
}

/// Password and card-number fields that leave autocomplete enabled.
pub fn check_autocomplete(snapshot: &PageSnapshot) -> Vec<Finding> {
    let document = Html::parse_document(snapshot.source);
    let selector = Selector::parse(
        "input[type=\"password\"], input[name*=\"card\"], input[name*=\"credit\"]",
    )
    .expect("static selector");

    let leaky = document.select(&selector).any(|el| {
        !matches!(el.value().attr("autocomplete"), Some(v) if v.eq_ignore_ascii_case("off"))
    });

    if leaky {
        vec![Finding::new(
            FindingKind::AutocompleteEnabled,
            snapshot.url,
            Severity::Medium,
            "Autocomplete not disabled on sensitive form fields",
        )]
    } else {
        Vec::new()
    }
}

/// Query parameter names worth testing for reflection.
const REFLECTABLE_PARAMS: &[&str] = &["search", "query", "q", "id", "user", "name"];

/// URL parameters whose value appears verbatim in the page content.
pub fn check_reflected_parameters(snapshot: &PageSnapshot) -> Vec<Finding> {
    let parsed = match Url::parse(snapshot.url) {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };

    for (key, value) in parsed.query_pairs() {
        if !REFLECTABLE_PARAMS.contains(&key.to_lowercase().as_str()) {
            continue;
        }
        // Very short values match everywhere and prove nothing.
        if value.len() < 3 {
            continue;
        }
        if snapshot.source.contains(value.as_ref()) {
            return vec![
                Finding::new(
                    FindingKind::ReflectedParameters,
                    snapshot.url,
                    Severity::Medium,
                    "URL parameters are reflected in the page content (potential XSS)",
                )
                .with_evidence(format!("{key}={value}")),
            ];
        }
    }
    Vec::new()
}
