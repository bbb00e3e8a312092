//! A scripted in-memory page driver.
//!
//! Pages are plain HTML keyed by URL; clicks resolve to declarative
//! effects (navigate, reveal an overlay, nothing). Harvests parse the
//! HTML the same way the Chrome adapter's snippets walk the live DOM,
//! so the orchestrator, form engine and analyzers run end-to-end
//! without a browser. `settle` is a no-op to keep the suites fast.

// Each integration binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use gossamer_crawler::driver::{
    ElementInfo, Locator, PageDriver, RawClickable, RawForm, RawInput, RawLink, RawSubmitControl,
};
use gossamer_crawler::error::{DriverError, Result};
use gossamer_crawler::rate_limit::RateLimitConfig;
use gossamer_crawler::session::CrawlConfig;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Crawl config suitable for driver-backed tests: no politeness
/// delays, no header probe, no screenshots.
pub fn test_config() -> CrawlConfig {
    let mut config = CrawlConfig::default()
        .with_scan_timeout(Duration::from_secs(30))
        .with_rate_limit(RateLimitConfig {
            enabled: false,
            min_delay: Duration::ZERO,
            jitter_max: Duration::ZERO,
        });
    config.probe_headers = false;
    config.settle_delay = Duration::ZERO;
    config.page_load_timeout = Duration::from_millis(100);
    config
}

#[derive(Debug, Clone)]
pub enum ClickEffect {
    /// Browser ends up on this URL (absolute or page-relative).
    Navigate(String),
    /// The page's overlay fragment becomes visible.
    RevealOverlay,
    /// Nothing observable happens.
    Nothing,
}

#[derive(Default)]
pub struct Journal {
    pub navigations: Vec<String>,
    pub fills: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub scripts: Vec<String>,
    pub escapes: usize,
}

pub struct MockPage {
    html: String,
    title: String,
    overlay_html: Option<String>,
    click_effects: HashMap<String, ClickEffect>,
}

pub struct SiteBuilder {
    pages: HashMap<String, MockPage>,
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        let title = extract_title(html);
        self.pages.insert(
            url.to_string(),
            MockPage {
                html: html.to_string(),
                title,
                overlay_html: None,
                click_effects: HashMap::new(),
            },
        );
        self
    }

    /// Attach an overlay fragment to a page, revealed by a
    /// `ClickEffect::RevealOverlay`.
    pub fn overlay(mut self, url: &str, html: &str) -> Self {
        if let Some(page) = self.pages.get_mut(url) {
            page.overlay_html = Some(html.to_string());
        }
        self
    }

    /// Wire a click effect to an element of a page. The key matches
    /// the element's id, name, or trimmed text.
    pub fn on_click(mut self, url: &str, key: &str, effect: ClickEffect) -> Self {
        if let Some(page) = self.pages.get_mut(url) {
            page.click_effects.insert(key.to_string(), effect);
        }
        self
    }

    pub fn build(self) -> MockDriver {
        MockDriver {
            pages: self.pages,
            current: None,
            frame: None,
            overlay_visible: false,
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }
}

fn extract_title(html: &str) -> String {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("title").unwrap();
    doc.select(&sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

pub struct MockDriver {
    pages: HashMap<String, MockPage>,
    current: Option<String>,
    /// URL of the iframe document currently scoped to, if any.
    frame: Option<String>,
    overlay_visible: bool,
    journal: Arc<Mutex<Journal>>,
}

impl MockDriver {
    pub fn journal(&self) -> Arc<Mutex<Journal>> {
        self.journal.clone()
    }

    fn lookup(&self, url: &str) -> Option<&MockPage> {
        if let Some(page) = self.pages.get(url) {
            return Some(page);
        }
        let key = gossamer_crawler::normalize::normalize_url(url);
        self.pages
            .iter()
            .find(|(stored, _)| gossamer_crawler::normalize::normalize_url(stored) == key)
            .map(|(_, page)| page)
    }

    fn current_page(&self) -> Option<&MockPage> {
        self.current.as_deref().and_then(|url| self.lookup(url))
    }

    /// The HTML all DOM operations currently act on.
    fn active_html(&self) -> String {
        if let Some(frame_url) = &self.frame {
            return self
                .lookup(frame_url)
                .map(|p| p.html.clone())
                .unwrap_or_default();
        }
        match self.current_page() {
            Some(page) => {
                let mut html = page.html.clone();
                if self.overlay_visible
                    && let Some(overlay) = &page.overlay_html
                {
                    html.push_str(overlay);
                }
                html
            }
            None => String::new(),
        }
    }

    fn resolve_absolute(&self, target: &str) -> String {
        match &self.current {
            Some(current) => Url::parse(current)
                .ok()
                .and_then(|base| base.join(target).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| target.to_string()),
            None => target.to_string(),
        }
    }

    fn go(&mut self, url: &str) {
        let absolute = self.resolve_absolute(url);
        self.current = Some(absolute);
        self.overlay_visible = false;
        self.frame = None;
    }
}

/// Key used to match click effects: id, then name, then trimmed text.
fn element_key(el: &ElementRef) -> String {
    if let Some(id) = el.value().attr("id") {
        return id.to_string();
    }
    if let Some(name) = el.value().attr("name") {
        return name.to_string();
    }
    el.text().collect::<String>().trim().to_string()
}

/// The same locator scheme the Chrome adapter computes in-page.
fn locator_for(doc: &Html, el: &ElementRef) -> Locator {
    if let Some(id) = el.value().attr("id") {
        return Locator::new(format!("[id=\"{id}\"]"), 0);
    }
    if let Some(name) = el.value().attr("name") {
        let css = format!("[name=\"{name}\"]");
        let sel = Selector::parse(&css).unwrap();
        let index = doc.select(&sel).position(|e| e.id() == el.id()).unwrap_or(0);
        return Locator::new(css, index);
    }
    let tag = el.value().name().to_string();
    let sel = Selector::parse(&tag).unwrap();
    let index = doc.select(&sel).position(|e| e.id() == el.id()).unwrap_or(0);
    Locator::new(tag, index)
}

fn is_visible(el: &ElementRef) -> bool {
    let style = el.value().attr("style").unwrap_or_default();
    if style.replace(' ', "").contains("display:none") {
        return false;
    }
    el.value().attr("hidden").is_none()
}

fn enclosing_form_action(el: &ElementRef) -> Option<String> {
    el.ancestors().filter_map(ElementRef::wrap).find_map(|a| {
        if a.value().name() == "form" {
            Some(a.value().attr("action").unwrap_or_default().to_string())
        } else {
            None
        }
    })
}

fn describe_form(doc: &Html, form_el: &ElementRef, container: bool, in_overlay: bool) -> RawForm {
    let input_sel = Selector::parse("input, select, textarea").unwrap();
    let control_sel = Selector::parse(
        "input[type=\"submit\"], input[type=\"button\"], input[type=\"image\"], button, [role=\"button\"], a",
    )
    .unwrap();
    let option_sel = Selector::parse("option").unwrap();

    let mut inputs = Vec::new();
    for el in form_el.select(&input_sel) {
        let tag = el.value().name().to_string();
        let input_type = el
            .value()
            .attr("type")
            .map(|t| t.to_lowercase())
            .unwrap_or_else(|| {
                if tag == "textarea" {
                    "textarea".to_string()
                } else if tag == "select" {
                    "select".to_string()
                } else {
                    "text".to_string()
                }
            });
        if matches!(input_type.as_str(), "submit" | "button" | "image" | "reset") {
            continue;
        }
        let options = if tag == "select" {
            el.select(&option_sel)
                .map(|o| o.text().collect::<String>().trim().to_string())
                .collect()
        } else {
            Vec::new()
        };
        inputs.push(RawInput {
            locator: locator_for(doc, &el),
            tag: tag.clone(),
            input_type,
            name: el.value().attr("name").unwrap_or_default().to_string(),
            id: el.value().attr("id").unwrap_or_default().to_string(),
            placeholder: el.value().attr("placeholder").unwrap_or_default().to_string(),
            required: el.value().attr("required").is_some(),
            options,
            checked: el.value().attr("checked").is_some(),
        });
    }

    let submit_controls = form_el
        .select(&control_sel)
        .map(|el| RawSubmitControl {
            locator: locator_for(doc, &el),
            tag: el.value().name().to_string(),
            input_type: el
                .value()
                .attr("type")
                .map(|t| t.to_lowercase())
                .unwrap_or_default(),
            css_class: el.value().attr("class").unwrap_or_default().to_string(),
            value: el.value().attr("value").unwrap_or_default().to_string(),
            text: el.text().collect::<String>().trim().to_string(),
            visible: is_visible(&el),
        })
        .collect();

    RawForm {
        action: form_el.value().attr("action").unwrap_or_default().to_string(),
        method: form_el
            .value()
            .attr("method")
            .map(|m| m.to_lowercase())
            .unwrap_or_else(|| "get".to_string()),
        id: form_el.value().attr("id").unwrap_or_default().to_string(),
        css_class: form_el.value().attr("class").unwrap_or_default().to_string(),
        inputs,
        submit_controls,
        container,
        in_overlay,
    }
}

fn harvest_forms_from(html: &str, in_overlay: bool) -> Vec<RawForm> {
    let doc = Html::parse_document(html);
    let form_sel = Selector::parse("form").unwrap();
    let container_sel = Selector::parse(
        "[class*=\"form\"], [class*=\"contact\"], [class*=\"signup\"], [class*=\"login\"], [role=\"form\"]",
    )
    .unwrap();
    let any_input_sel = Selector::parse("input, select, textarea").unwrap();

    let mut forms: Vec<RawForm> = doc
        .select(&form_sel)
        .map(|el| describe_form(&doc, &el, false, in_overlay))
        .collect();

    for el in doc.select(&container_sel) {
        if el.value().name() == "form" {
            continue;
        }
        let inside_form = el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| a.value().name() == "form");
        if inside_form || el.select(&any_input_sel).next().is_none() {
            continue;
        }
        forms.push(describe_form(&doc, &el, true, in_overlay));
    }
    forms
}

impl PageDriver for MockDriver {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.journal.lock().unwrap().navigations.push(url.to_string());
        self.go(url);
        Ok(())
    }

    fn wait_until_ready(&mut self, timeout: Duration) -> Result<()> {
        if self.current_page().is_some() {
            Ok(())
        } else {
            Err(DriverError::Timeout(timeout))
        }
    }

    fn current_url(&mut self) -> Result<String> {
        Ok(self.current.clone().unwrap_or_default())
    }

    fn title(&mut self) -> Result<String> {
        Ok(self
            .current_page()
            .map(|p| p.title.clone())
            .unwrap_or_default())
    }

    fn page_source(&mut self) -> Result<String> {
        Ok(self.active_html())
    }

    fn harvest_forms(&mut self) -> Result<Vec<RawForm>> {
        if let Some(frame_url) = self.frame.clone() {
            let html = self
                .lookup(&frame_url)
                .map(|p| p.html.clone())
                .unwrap_or_default();
            return Ok(harvest_forms_from(&html, false));
        }
        let Some(page) = self.current_page() else {
            return Ok(Vec::new());
        };
        let base = page.html.clone();
        let overlay = if self.overlay_visible {
            page.overlay_html.clone()
        } else {
            None
        };

        let mut forms = harvest_forms_from(&base, false);
        if let Some(overlay) = overlay {
            forms.extend(harvest_forms_from(&overlay, true));
        }
        Ok(forms)
    }

    fn harvest_links(&mut self) -> Result<Vec<RawLink>> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let sel = Selector::parse("a[href]").unwrap();
        Ok(doc
            .select(&sel)
            .enumerate()
            .map(|(i, el)| RawLink {
                locator: Locator::new("a[href]", i),
                href: el.value().attr("href").unwrap_or_default().to_string(),
                text: el.text().collect::<String>().trim().to_string(),
                visible: is_visible(&el),
            })
            .collect())
    }

    fn harvest_clickables(&mut self) -> Result<Vec<RawClickable>> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let sel = Selector::parse(
            "button, [role=\"button\"], [onclick], [class*=\"btn\"], [class*=\"clickable\"], [class*=\"toggle\"]",
        )
        .unwrap();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for el in doc.select(&sel) {
            if !seen.insert(el.id()) || !is_visible(&el) {
                continue;
            }
            let inside_form = el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| a.value().name() == "form");
            if inside_form {
                continue;
            }
            out.push(RawClickable {
                locator: locator_for(&doc, &el),
                tag: el.value().name().to_string(),
                text: el.text().collect::<String>().trim().to_string(),
            });
        }
        Ok(out)
    }

    fn find_elements(&mut self, selector: &str) -> Result<Vec<ElementInfo>> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let sel = Selector::parse(selector)
            .map_err(|e| DriverError::Script(format!("bad selector: {e}")))?;
        Ok(doc
            .select(&sel)
            .enumerate()
            .map(|(i, el)| {
                let attributes = el
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                ElementInfo {
                    locator: Locator::new(selector, i),
                    tag: el.value().name().to_string(),
                    attributes,
                    text: el.text().collect::<String>().trim().to_string(),
                    visible: is_visible(&el),
                }
            })
            .collect())
    }

    fn fill(&mut self, target: &Locator, value: &str) -> Result<bool> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let Ok(sel) = Selector::parse(&target.css) else {
            return Ok(false);
        };
        if doc.select(&sel).nth(target.index).is_none() {
            return Ok(false);
        }
        self.journal
            .lock()
            .unwrap()
            .fills
            .push((target.css.clone(), value.to_string()));
        Ok(true)
    }

    fn select_by_index(&mut self, target: &Locator, option_index: usize) -> Result<bool> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let Ok(sel) = Selector::parse(&target.css) else {
            return Ok(false);
        };
        let Some(el) = doc.select(&sel).nth(target.index) else {
            return Ok(false);
        };
        let option_sel = Selector::parse("option").unwrap();
        if el.select(&option_sel).count() <= option_index {
            return Ok(false);
        }
        self.journal
            .lock()
            .unwrap()
            .fills
            .push((target.css.clone(), format!("option:{option_index}")));
        Ok(true)
    }

    fn set_checked(&mut self, target: &Locator, checked: bool) -> Result<bool> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let Ok(sel) = Selector::parse(&target.css) else {
            return Ok(false);
        };
        if doc.select(&sel).nth(target.index).is_none() {
            return Ok(false);
        }
        self.journal
            .lock()
            .unwrap()
            .fills
            .push((target.css.clone(), format!("checked:{checked}")));
        Ok(true)
    }

    fn click(&mut self, target: &Locator) -> Result<bool> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let Ok(sel) = Selector::parse(&target.css) else {
            return Ok(false);
        };
        let Some(el) = doc.select(&sel).nth(target.index) else {
            return Ok(false);
        };
        let key = element_key(&el);
        self.journal.lock().unwrap().clicks.push(key.clone());

        // A click inside a frame never navigates the top document.
        if self.frame.is_some() {
            return Ok(true);
        }

        let effect = self
            .current_page()
            .and_then(|p| p.click_effects.get(&key))
            .cloned();
        match effect {
            Some(ClickEffect::Navigate(url)) => {
                self.go(&url);
            }
            Some(ClickEffect::RevealOverlay) => {
                self.overlay_visible = true;
            }
            Some(ClickEffect::Nothing) => {}
            None => {
                // Submit controls default to their form's action.
                let tag = el.value().name();
                let ty = el.value().attr("type").unwrap_or_default();
                let is_submit = tag == "button" || ty == "submit" || ty == "image";
                if is_submit
                    && let Some(action) = enclosing_form_action(&el)
                    && !action.is_empty()
                {
                    self.go(&action);
                }
            }
        }
        Ok(true)
    }

    fn submit_via_enter(&mut self, target: &Locator) -> Result<bool> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let Ok(sel) = Selector::parse(&target.css) else {
            return Ok(false);
        };
        let Some(el) = doc.select(&sel).nth(target.index) else {
            return Ok(false);
        };
        if let Some(action) = enclosing_form_action(&el)
            && !action.is_empty()
        {
            self.go(&action);
        }
        Ok(true)
    }

    fn execute_script(&mut self, script: &str) -> Result<serde_json::Value> {
        self.journal.lock().unwrap().scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    fn send_escape(&mut self) -> Result<()> {
        self.journal.lock().unwrap().escapes += 1;
        self.overlay_visible = false;
        Ok(())
    }

    fn switch_to_frame(&mut self, index: usize) -> Result<()> {
        let html = self.active_html();
        let doc = Html::parse_document(&html);
        let sel = Selector::parse("iframe").unwrap();
        let Some(iframe) = doc.select(&sel).nth(index) else {
            return Err(DriverError::NotFound(format!("iframe {index}")));
        };
        let src = iframe.value().attr("src").unwrap_or_default();
        let absolute = self.resolve_absolute(src);
        if self.lookup(&absolute).is_none() {
            return Err(DriverError::NotFound(format!("iframe document {absolute}")));
        }
        self.frame = Some(absolute);
        Ok(())
    }

    fn switch_to_default(&mut self) -> Result<()> {
        self.frame = None;
        Ok(())
    }

    fn settle(&mut self, _duration: Duration) {
        // Instant in tests.
    }
}
