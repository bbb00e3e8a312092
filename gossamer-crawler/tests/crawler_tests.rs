// Traversal behavior of the crawl orchestrator over a scripted site.

mod common;

use common::{SiteBuilder, test_config};
use gossamer_crawler::crawler::Crawler;
use gossamer_crawler::normalize::normalize_url;
use gossamer_crawler::visit::{FindingKind, Severity};
use std::collections::HashSet;
use std::time::Duration;

// ============================================================================
// Depth and fan-out bounds
// ============================================================================

#[test]
fn depth_bound_is_enforced_before_navigation() {
    let driver = SiteBuilder::new()
        .page(
            "http://site.example/",
            r#"<html><title>Home</title><body><a href="/p1">one</a></body></html>"#,
        )
        .page(
            "http://site.example/p1",
            r#"<html><body><a href="/p2">two</a></body></html>"#,
        )
        .page(
            "http://site.example/p2",
            r#"<html><body><a href="/p3">three</a></body></html>"#,
        )
        .page("http://site.example/p3", "<html><body>deep</body></html>")
        .build();

    let session = Crawler::new(driver, test_config().with_max_depth(2)).run("http://site.example/");

    assert!(session.activity.iter().all(|v| v.depth <= 2));
    assert!(session.is_visited(&normalize_url("http://site.example/p2")));
    assert!(!session.is_visited(&normalize_url("http://site.example/p3")));
}

#[test]
fn max_depth_zero_visits_exactly_the_seed() {
    let driver = SiteBuilder::new()
        .page(
            "http://site.example/",
            r#"<html><body>
                <a href="/a">a</a>
                <a href="/b">b</a>
            </body></html>"#,
        )
        .page("http://site.example/a", "<html><body>a</body></html>")
        .page("http://site.example/b", "<html><body>b</body></html>")
        .build();
    let journal = driver.journal();

    let session = Crawler::new(driver, test_config().with_max_depth(0)).run("http://site.example/");

    assert_eq!(session.visited_urls().len(), 1);
    assert_eq!(session.activity.len(), 1);
    assert_eq!(session.activity[0].depth, 0);
    assert_eq!(journal.lock().unwrap().navigations.len(), 1);
}

#[test]
fn fan_out_is_truncated_to_max_links_with_priority_order() {
    let mut home = String::from("<html><body>");
    for i in 0..10 {
        home.push_str(&format!(r#"<a href="/page{i}">page {i}</a>"#));
    }
    home.push_str(r#"<a href="/admin">Admin console</a>"#);
    home.push_str(r#"<a href="/login">Log in</a>"#);
    home.push_str("</body></html>");

    let mut builder = SiteBuilder::new().page("http://site.example/", &home);
    for i in 0..10 {
        builder = builder.page(
            &format!("http://site.example/page{i}"),
            "<html><body>page</body></html>",
        );
    }
    builder = builder
        .page("http://site.example/admin", "<html><body>admin</body></html>")
        .page("http://site.example/login", "<html><body>login</body></html>");
    let driver = builder.build();

    let config = test_config().with_max_depth(1).with_max_links_per_page(5);
    let session = Crawler::new(driver, config).run("http://site.example/");

    // Seed plus exactly five followed links.
    assert_eq!(session.visited_urls().len(), 6);
    // The security-sensitive links were chosen first.
    assert!(session.is_visited(&normalize_url("http://site.example/admin")));
    assert!(session.is_visited(&normalize_url("http://site.example/login")));
}

// ============================================================================
// Visited-set discipline
// ============================================================================

#[test]
fn cyclic_links_do_not_revisit() {
    let driver = SiteBuilder::new()
        .page(
            "http://site.example/a",
            r#"<html><body><a href="/b">b</a></body></html>"#,
        )
        .page(
            "http://site.example/b",
            r#"<html><body><a href="/a">a</a></body></html>"#,
        )
        .build();

    let session = Crawler::new(driver, test_config()).run("http://site.example/a");

    assert_eq!(session.activity.len(), 2);
    let unique: HashSet<&String> = session.visited_urls().iter().collect();
    assert_eq!(unique.len(), session.visited_urls().len());
}

#[test]
fn visited_urls_are_normalized_keys() {
    let driver = SiteBuilder::new()
        .page(
            "http://site.example/",
            r#"<html><body>
                <a href="/About/">about with slash</a>
                <a href="/About">about</a>
            </body></html>"#,
        )
        .page("http://site.example/About", "<html><body>about</body></html>")
        .build();

    let session = Crawler::new(driver, test_config()).run("http://site.example/");

    for key in session.visited_urls() {
        assert_eq!(key, &normalize_url(key), "visited key not in normal form");
    }
    // The two spellings collapse to one visit.
    assert_eq!(session.activity.len(), 2);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn dead_link_records_a_finding_and_scan_continues() {
    let driver = SiteBuilder::new()
        .page(
            "http://site.example/",
            r#"<html><body>
                <a href="/missing">gone</a>
                <a href="/alive">alive</a>
            </body></html>"#,
        )
        .page("http://site.example/alive", "<html><body>ok</body></html>")
        .build();

    let session = Crawler::new(driver, test_config()).run("http://site.example/");

    assert!(session.is_visited(&normalize_url("http://site.example/alive")));
    assert!(
        session
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::CrawlError && f.severity == Severity::Low)
    );
    // The dead branch did not take the live one down with it.
    assert_eq!(session.activity.len(), 2);
}

#[test]
fn unreachable_seed_yields_empty_session_not_panic() {
    let driver = SiteBuilder::new().build();
    let session = Crawler::new(driver, test_config()).run("http://nowhere.example/");

    assert_eq!(session.activity.len(), 0);
    assert_eq!(session.visited_urls().len(), 1);
    assert!(
        session
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::CrawlError)
    );
}

#[test]
fn zero_timeout_visits_nothing() {
    let driver = SiteBuilder::new()
        .page("http://site.example/", "<html><body>hi</body></html>")
        .build();

    let config = test_config().with_scan_timeout(Duration::ZERO);
    let session = Crawler::new(driver, config).run("http://site.example/");

    assert!(session.activity.is_empty());
    assert_eq!(session.visited_urls().len(), 1);
}

// ============================================================================
// Analyzer wiring
// ============================================================================

#[test]
fn plain_http_login_page_yields_both_transport_findings() {
    let driver = SiteBuilder::new()
        .page(
            "http://bank.example/login",
            r#"<html><title>Sign in</title><body>
                <form action="/doLogin" method="post">
                    <input type="text" name="uid">
                    <input type="password" name="passw">
                </form>
            </body></html>"#,
        )
        .page("http://bank.example/doLogin", "<html><body>ok</body></html>")
        .build();

    let session = Crawler::new(driver, test_config()).run("http://bank.example/login");

    let kinds: Vec<FindingKind> = session.findings.iter().map(|f| f.kind).collect();
    assert!(kinds.contains(&FindingKind::InsecureConnection));
    assert!(kinds.contains(&FindingKind::InsecureLogin));
    assert!(
        session
            .findings
            .iter()
            .filter(|f| matches!(
                f.kind,
                FindingKind::InsecureConnection | FindingKind::InsecureLogin
            ))
            .all(|f| f.severity == Severity::High)
    );
}

#[test]
fn reflected_query_parameter_is_flagged_only_when_reflected() {
    let driver = SiteBuilder::new()
        .page(
            "http://site.example/results?q=hello",
            "<html><body>search results for hello</body></html>",
        )
        .build();
    let session = Crawler::new(driver, test_config()).run("http://site.example/results?q=hello");
    let reflected: Vec<_> = session
        .findings
        .iter()
        .filter(|f| f.kind == FindingKind::ReflectedParameters)
        .collect();
    assert_eq!(reflected.len(), 1);
    assert_eq!(reflected[0].severity, Severity::Medium);

    let driver = SiteBuilder::new()
        .page(
            "http://site.example/results?q=goodbye",
            "<html><body>nothing here</body></html>",
        )
        .build();
    let session = Crawler::new(driver, test_config()).run("http://site.example/results?q=goodbye");
    assert!(
        session
            .findings
            .iter()
            .all(|f| f.kind != FindingKind::ReflectedParameters)
    );
}

#[test]
fn page_visit_records_title_links_and_depth() {
    let driver = SiteBuilder::new()
        .page(
            "http://site.example/",
            r#"<html><title>Front</title><body>
                <a href="/sub">sub page</a>
                <a href="https://elsewhere.example/">external</a>
            </body></html>"#,
        )
        .page("http://site.example/sub", "<html><title>Sub</title><body>s</body></html>")
        .build();

    let session = Crawler::new(driver, test_config()).run("http://site.example/");

    let front = session
        .activity
        .iter()
        .find(|v| v.title == "Front")
        .expect("front page visit");
    assert_eq!(front.depth, 0);
    // Only the in-domain link is recorded.
    assert_eq!(front.links.len(), 1);
    assert_eq!(front.links[0].url, "http://site.example/sub");

    let sub = session.activity.iter().find(|v| v.title == "Sub").unwrap();
    assert_eq!(sub.depth, 1);
}
