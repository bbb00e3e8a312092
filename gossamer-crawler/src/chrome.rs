//! `PageDriver` over a headless Chrome/Chromium session.
//!
//! Every DOM operation is an injected JavaScript snippet evaluated in
//! the page, returning JSON. Frame context is handled by pointing the
//! snippet's document root at the selected iframe's contentDocument,
//! which works for the same-origin frames the engine sweeps. The
//! browser process is released when the driver is dropped.

use crate::driver::{
    ElementInfo, Locator, PageDriver, RawClickable, RawForm, RawInput, RawLink, RawSubmitControl,
};
use crate::error::{DriverError, Result};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct ChromeDriver {
    // Keeps the browser process alive for the driver's lifetime;
    // dropping it releases the process.
    _browser: Browser,
    tab: Arc<Tab>,
    frame: Option<usize>,
    /// Pierce open shadow roots when querying the page. Sites built on
    /// web components keep their real forms there.
    shadow_dom: bool,
}

impl ChromeDriver {
    /// Start a browser session. This is the only operation whose
    /// failure is fatal to a scan.
    pub fn launch(headless: bool) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(headless)
            .window_size(Some((1366, 768)))
            .sandbox(false)
            .idle_browser_timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| DriverError::Session(format!("launch options: {e}")))?;

        let browser =
            Browser::new(options).map_err(|e| DriverError::Session(format!("chrome launch: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::Session(format!("new tab: {e}")))?;

        info!("browser session started");
        Ok(Self {
            _browser: browser,
            tab,
            frame: None,
            shadow_dom: true,
        })
    }

    pub fn with_shadow_dom(mut self, enabled: bool) -> Self {
        self.shadow_dom = enabled;
        self
    }

    /// Expression yielding the document all snippets operate on.
    fn root_expr(&self) -> String {
        match self.frame {
            Some(index) => format!(
                "((document.querySelectorAll('iframe')[{index}] || {{}}).contentDocument || document)"
            ),
            None => "document".to_string(),
        }
    }

    fn eval(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, true)
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Run a snippet that returns `JSON.stringify(...)` and
    /// deserialize its payload.
    fn eval_json<T: for<'de> Deserialize<'de>>(&self, script: &str) -> Result<T> {
        let value = self.eval(script)?;
        let text = value
            .as_str()
            .ok_or_else(|| DriverError::Script("expected JSON string from page".to_string()))?;
        serde_json::from_str(text).map_err(|e| DriverError::Script(format!("bad page JSON: {e}")))
    }

    fn eval_bool(&self, script: &str) -> Result<bool> {
        Ok(self.eval(script)?.as_bool().unwrap_or(false))
    }

    /// Query helper shared by every snippet: like querySelectorAll,
    /// optionally descending into open shadow roots, in document
    /// order.
    fn deep_query_js(&self) -> String {
        format!(
            r#"
            const PIERCE_SHADOW = {pierce};
            function deepQueryAll(scope, sel) {{
                const out = Array.from(scope.querySelectorAll(sel));
                if (!PIERCE_SHADOW) return out;
                scope.querySelectorAll('*').forEach(host => {{
                    if (host.shadowRoot) {{
                        out.push(...deepQueryAll(host.shadowRoot, sel));
                    }}
                }});
                return out;
            }}
            "#,
            pierce = self.shadow_dom
        )
    }

    /// Snippet prelude that re-resolves a locator into `el` (possibly
    /// undefined) against the current root.
    fn resolve_prelude(&self, target: &Locator) -> String {
        format!(
            r#"
            const root = {root};
            {deep}
            const el = deepQueryAll(root, {css})[{index}];
            "#,
            root = self.root_expr(),
            deep = self.deep_query_js(),
            css = js_string(&target.css),
            index = target.index
        )
    }
}

/// JSON-escape a string for embedding into a snippet.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// The locator scheme shared by all harvest snippets: prefer a unique
/// id, then a name-scoped index, then a tag-scoped index.
const LOCATOR_JS: &str = r#"
    function locatorFor(el) {
        if (el.id) {
            return { css: '[id="' + el.id + '"]', index: 0 };
        }
        if (el.name) {
            const sel = '[name="' + el.name + '"]';
            const all = deepQueryAll(root, sel);
            return { css: sel, index: Math.max(0, all.indexOf(el)) };
        }
        const tag = el.tagName.toLowerCase();
        const all = deepQueryAll(root, tag);
        return { css: tag, index: Math.max(0, all.indexOf(el)) };
    }
    function isVisible(el) {
        return el.offsetParent !== null;
    }
"#;

#[derive(Deserialize)]
struct WireLocator {
    css: String,
    index: usize,
}

impl From<WireLocator> for Locator {
    fn from(w: WireLocator) -> Self {
        Locator::new(w.css, w.index)
    }
}

#[derive(Deserialize)]
struct WireInput {
    locator: WireLocator,
    tag: String,
    #[serde(rename = "type")]
    input_type: String,
    name: String,
    id: String,
    placeholder: String,
    required: bool,
    options: Vec<String>,
    checked: bool,
}

#[derive(Deserialize)]
struct WireSubmitControl {
    locator: WireLocator,
    tag: String,
    #[serde(rename = "type")]
    input_type: String,
    class: String,
    value: String,
    text: String,
    visible: bool,
}

#[derive(Deserialize)]
struct WireForm {
    action: String,
    method: String,
    id: String,
    class: String,
    inputs: Vec<WireInput>,
    submit_controls: Vec<WireSubmitControl>,
    container: bool,
    in_overlay: bool,
}

#[derive(Deserialize)]
struct WireLink {
    locator: WireLocator,
    href: String,
    text: String,
    visible: bool,
}

#[derive(Deserialize)]
struct WireClickable {
    locator: WireLocator,
    tag: String,
    text: String,
}

#[derive(Deserialize)]
struct WireElement {
    locator: WireLocator,
    tag: String,
    attributes: HashMap<String, String>,
    text: String,
    visible: bool,
}

impl PageDriver for ChromeDriver {
    fn navigate(&mut self, url: &str) -> Result<()> {
        // Leaving the page invalidates any frame selection.
        self.frame = None;
        self.tab
            .navigate_to(url)
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        Ok(())
    }

    fn wait_until_ready(&mut self, timeout: Duration) -> Result<()> {
        self.tab
            .wait_until_navigated()
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        self.tab
            .wait_for_element_with_custom_timeout("body", timeout)
            .map_err(|_| DriverError::Timeout(timeout))?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn title(&mut self) -> Result<String> {
        self.tab
            .get_title()
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    fn page_source(&mut self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    fn harvest_forms(&mut self) -> Result<Vec<RawForm>> {
        let script = format!(
            r#"
            (function() {{
                const root = {root};
                {deep}
                {locator_js}
                const OVERLAY = '.modal, [role="dialog"], .dropdown-menu, .popover, .collapse, [role="tabpanel"], .overlay, .popup';

                function describeInput(el) {{
                    const tag = el.tagName.toLowerCase();
                    const type = (el.type || (tag === 'textarea' ? 'textarea' : 'text')).toLowerCase();
                    const options = tag === 'select'
                        ? Array.from(el.querySelectorAll('option')).map(o => o.textContent.trim())
                        : [];
                    return {{
                        locator: locatorFor(el),
                        tag: tag,
                        type: type,
                        name: el.name || '',
                        id: el.id || '',
                        placeholder: el.placeholder || '',
                        required: el.required || el.getAttribute('aria-required') === 'true',
                        options: options,
                        checked: !!el.checked
                    }};
                }}

                function describeControl(el) {{
                    return {{
                        locator: locatorFor(el),
                        tag: el.tagName.toLowerCase(),
                        type: (el.getAttribute('type') || '').toLowerCase(),
                        class: el.className || '',
                        value: el.value || '',
                        text: (el.textContent || '').trim(),
                        visible: isVisible(el)
                    }};
                }}

                function describe(scope, action, method, container) {{
                    const inputs = Array.from(
                        scope.querySelectorAll('input, select, textarea')
                    ).filter(el => {{
                        const type = (el.type || '').toLowerCase();
                        return type !== 'submit' && type !== 'button' && type !== 'image' && type !== 'reset';
                    }}).map(describeInput);
                    const controls = Array.from(scope.querySelectorAll(
                        'input[type="submit"], input[type="button"], input[type="image"], button, [role="button"], a'
                    )).map(describeControl);
                    const overlay = scope.closest(OVERLAY);
                    return {{
                        action: action,
                        method: method,
                        id: scope.id || '',
                        class: scope.className || '',
                        inputs: inputs,
                        submit_controls: controls,
                        container: container,
                        in_overlay: overlay !== null && overlay.offsetParent !== null
                    }};
                }}

                const results = [];
                deepQueryAll(root, 'form').forEach(form => {{
                    results.push(describe(
                        form,
                        form.getAttribute('action') || '',
                        (form.getAttribute('method') || 'get').toLowerCase(),
                        false
                    ));
                }});
                deepQueryAll(
                    root,
                    '[class*="form"], [class*="contact"], [class*="signup"], [class*="login"], [role="form"]'
                ).forEach(box => {{
                    if (box.closest('form') || box.tagName.toLowerCase() === 'form') return;
                    if (!box.querySelector('input, select, textarea')) return;
                    results.push(describe(box, '', 'post', true));
                }});
                return JSON.stringify(results);
            }})()
            "#,
            root = self.root_expr(),
            deep = self.deep_query_js(),
            locator_js = LOCATOR_JS,
        );

        let wire: Vec<WireForm> = self.eval_json(&script)?;
        debug!(count = wire.len(), "harvested forms");
        Ok(wire
            .into_iter()
            .map(|f| RawForm {
                action: f.action,
                method: f.method,
                id: f.id,
                css_class: f.class,
                inputs: f
                    .inputs
                    .into_iter()
                    .map(|i| RawInput {
                        locator: i.locator.into(),
                        tag: i.tag,
                        input_type: i.input_type,
                        name: i.name,
                        id: i.id,
                        placeholder: i.placeholder,
                        required: i.required,
                        options: i.options,
                        checked: i.checked,
                    })
                    .collect(),
                submit_controls: f
                    .submit_controls
                    .into_iter()
                    .map(|c| RawSubmitControl {
                        locator: c.locator.into(),
                        tag: c.tag,
                        input_type: c.input_type,
                        css_class: c.class,
                        value: c.value,
                        text: c.text,
                        visible: c.visible,
                    })
                    .collect(),
                container: f.container,
                in_overlay: f.in_overlay,
            })
            .collect())
    }

    fn harvest_links(&mut self) -> Result<Vec<RawLink>> {
        let script = format!(
            r#"
            (function() {{
                const root = {root};
                {deep}
                {locator_js}
                const anchors = deepQueryAll(root, 'a[href]');
                return JSON.stringify(anchors.map((a, i) => ({{
                    locator: {{ css: 'a[href]', index: i }},
                    href: a.getAttribute('href') || '',
                    text: (a.textContent || '').trim(),
                    visible: isVisible(a)
                }})));
            }})()
            "#,
            root = self.root_expr(),
            deep = self.deep_query_js(),
            locator_js = LOCATOR_JS,
        );
        let wire: Vec<WireLink> = self.eval_json(&script)?;
        Ok(wire
            .into_iter()
            .map(|l| RawLink {
                locator: l.locator.into(),
                href: l.href,
                text: l.text,
                visible: l.visible,
            })
            .collect())
    }

    fn harvest_clickables(&mut self) -> Result<Vec<RawClickable>> {
        let script = format!(
            r#"
            (function() {{
                const root = {root};
                {deep}
                {locator_js}
                const seen = new Set();
                const out = [];
                function add(el) {{
                    if (seen.has(el) || !isVisible(el)) return;
                    if (el.closest('form')) return;
                    seen.add(el);
                    out.push({{
                        locator: locatorFor(el),
                        tag: el.tagName.toLowerCase(),
                        text: (el.textContent || el.value || '').trim().slice(0, 80)
                    }});
                }}
                deepQueryAll(root, 'button, [role="button"], [onclick]').forEach(add);
                deepQueryAll(
                    root,
                    '[class*="btn"], [class*="button"], [class*="clickable"], [class*="toggle"]'
                ).forEach(add);
                // Framework bindings rarely leave a marker beyond the cursor.
                deepQueryAll(root, 'div, span')
                    .filter(el => window.getComputedStyle(el).cursor === 'pointer')
                    .slice(0, 25)
                    .forEach(add);
                return JSON.stringify(out.slice(0, 50));
            }})()
            "#,
            root = self.root_expr(),
            deep = self.deep_query_js(),
            locator_js = LOCATOR_JS,
        );
        let wire: Vec<WireClickable> = self.eval_json(&script)?;
        Ok(wire
            .into_iter()
            .map(|c| RawClickable {
                locator: c.locator.into(),
                tag: c.tag,
                text: c.text,
            })
            .collect())
    }

    fn find_elements(&mut self, selector: &str) -> Result<Vec<ElementInfo>> {
        let script = format!(
            r#"
            (function() {{
                const root = {root};
                {deep}
                {locator_js}
                const sel = {selector};
                const out = deepQueryAll(root, sel).map((el, i) => {{
                    const attributes = {{}};
                    for (const attr of el.attributes) {{
                        attributes[attr.name] = attr.value;
                    }}
                    return {{
                        locator: {{ css: sel, index: i }},
                        tag: el.tagName.toLowerCase(),
                        attributes: attributes,
                        text: (el.textContent || '').trim().slice(0, 200),
                        visible: isVisible(el)
                    }};
                }});
                return JSON.stringify(out);
            }})()
            "#,
            root = self.root_expr(),
            deep = self.deep_query_js(),
            locator_js = LOCATOR_JS,
            selector = js_string(selector),
        );
        let wire: Vec<WireElement> = self.eval_json(&script)?;
        Ok(wire
            .into_iter()
            .map(|e| ElementInfo {
                locator: e.locator.into(),
                tag: e.tag,
                attributes: e.attributes,
                text: e.text,
                visible: e.visible,
            })
            .collect())
    }

    fn fill(&mut self, target: &Locator, value: &str) -> Result<bool> {
        let script = format!(
            r#"
            (function() {{
                {prelude}
                if (!el) return false;
                el.focus();
                el.value = {value};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                el.dispatchEvent(new Event('blur', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            prelude = self.resolve_prelude(target),
            value = js_string(value),
        );
        self.eval_bool(&script)
    }

    fn select_by_index(&mut self, target: &Locator, option_index: usize) -> Result<bool> {
        let script = format!(
            r#"
            (function() {{
                {prelude}
                if (!el || !el.options || el.options.length <= {option_index}) return false;
                el.selectedIndex = {option_index};
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            prelude = self.resolve_prelude(target),
            option_index = option_index,
        );
        self.eval_bool(&script)
    }

    fn set_checked(&mut self, target: &Locator, checked: bool) -> Result<bool> {
        let script = format!(
            r#"
            (function() {{
                {prelude}
                if (!el) return false;
                el.checked = {checked};
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            prelude = self.resolve_prelude(target),
            checked = checked,
        );
        self.eval_bool(&script)
    }

    fn click(&mut self, target: &Locator) -> Result<bool> {
        let script = format!(
            r#"
            (function() {{
                {prelude}
                if (!el) return false;
                el.scrollIntoView({{ block: 'center' }});
                try {{
                    el.click();
                }} catch (e) {{
                    el.dispatchEvent(new MouseEvent('click', {{ bubbles: true, cancelable: true }}));
                }}
                return true;
            }})()
            "#,
            prelude = self.resolve_prelude(target),
        );
        self.eval_bool(&script)
    }

    fn submit_via_enter(&mut self, target: &Locator) -> Result<bool> {
        let script = format!(
            r#"
            (function() {{
                {prelude}
                if (!el) return false;
                el.focus();
                el.dispatchEvent(new KeyboardEvent('keydown', {{ key: 'Enter', bubbles: true }}));
                el.dispatchEvent(new KeyboardEvent('keyup', {{ key: 'Enter', bubbles: true }}));
                if (el.form) {{
                    if (typeof el.form.requestSubmit === 'function') {{
                        el.form.requestSubmit();
                    }} else {{
                        el.form.submit();
                    }}
                }}
                return true;
            }})()
            "#,
            prelude = self.resolve_prelude(target),
        );
        self.eval_bool(&script)
    }

    fn execute_script(&mut self, script: &str) -> Result<serde_json::Value> {
        self.eval(script)
    }

    fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    fn send_escape(&mut self) -> Result<()> {
        self.tab
            .press_key("Escape")
            .map(|_| ())
            .map_err(|e| DriverError::Script(e.to_string()))
    }

    fn switch_to_frame(&mut self, index: usize) -> Result<()> {
        // Confirm the frame document is actually reachable (same
        // origin) before scoping to it.
        let script = format!(
            "(function() {{ const f = document.querySelectorAll('iframe')[{index}]; \
             return !!(f && f.contentDocument); }})()"
        );
        if self.eval_bool(&script)? {
            self.frame = Some(index);
            Ok(())
        } else {
            Err(DriverError::NotFound(format!(
                "iframe {index} is missing or cross-origin"
            )))
        }
    }

    fn switch_to_default(&mut self) -> Result<()> {
        self.frame = None;
        Ok(())
    }
}
