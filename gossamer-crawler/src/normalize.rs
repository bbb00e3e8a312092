//! Canonical URL keys for visited-set membership.
//!
//! The key intentionally drops the scheme: `http://` and `https://`
//! variants of the same page collapse to a single visit. Keys are for
//! set membership only - navigation always uses the original URL, and
//! callers must not assume a normalized key parses as a URL.

use url::Url;

/// Query parameters that only identify traffic sources and would make
/// otherwise identical pages look distinct.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "ref",
    "referrer",
];

/// Canonicalize a URL into a visited-set key.
///
/// Unparseable input is returned unchanged - a fallback, not an error.
pub fn normalize_url(raw: &str) -> String {
    let parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return raw.to_string(),
    };

    let host = match parsed.host_str() {
        Some(h) => h,
        // "Parsed" strings like `example.com:8080/x` come out hostless;
        // treat them the same as unparseable input.
        None => return raw.to_string(),
    };

    let mut key = String::new();
    key.push_str(host);
    if let Some(port) = parsed.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(parsed.path());

    // Retain non-tracking query parameters in their original order.
    let retained: Vec<String> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| {
            if v.is_empty() {
                k.to_string()
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect();
    if !retained.is_empty() {
        key.push('?');
        key.push_str(&retained.join("&"));
    }

    let mut key = key.to_lowercase();
    while key.ends_with('/') {
        key.pop();
    }
    key
}

/// The domain used for per-host politeness bookkeeping.
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

/// True when both URLs share a hostname.
pub fn same_host(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => match (a.host_str(), b.host_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        },
        _ => false,
    }
}
