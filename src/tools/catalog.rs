//! The built-in tool catalog
//!
//! Each tool performs one browser action against the shared session page and
//! returns a [`ToolOutcome`]. Actions known to trigger asynchronous page
//! updates (navigation, submit) are followed by a short settle delay.

use crate::error::{CaptureError, Error, NavigationError, ResolveError, Result};
use crate::resolve;
use crate::session::Session;
use crate::tools::{ToolOutcome, ToolSpec};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Bound on selector resolution for click/type tools
const ELEMENT_TIMEOUT_MS: u64 = 5000;

/// Bound on locating an explicitly named submit button
const SUBMIT_BUTTON_TIMEOUT_MS: u64 = 2000;

/// Settle after navigation and form submission
const SETTLE_NAV_MS: u64 = 400;

/// Settle after click/type actions
const SETTLE_ACTION_MS: u64 = 150;

/// Sleep out asynchronous page updates after a navigation-class action.
/// Jittered so repeated calls do not beat in lockstep with page timers.
async fn settle_nav() {
    let jitter = rand::random::<u64>() % 200;
    tokio::time::sleep(Duration::from_millis(SETTLE_NAV_MS + jitter)).await;
}

async fn settle_action() {
    tokio::time::sleep(Duration::from_millis(SETTLE_ACTION_MS)).await;
}

/// Convert an inner result into the tool's outcome, preserving the
/// underlying message on failure.
fn outcome(context: &str, result: Result<String>) -> ToolOutcome {
    match result {
        Ok(message) => ToolOutcome::success(message),
        Err(e) => ToolOutcome::failure_with(context, e.to_string()),
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    // Schema validation has already guaranteed presence and type for
    // required keys.
    args.get(key).and_then(|v| v.as_str()).unwrap_or_default()
}

// ============================================================================
// Navigation
// ============================================================================

fn parse_url(raw: &str) -> Result<Url> {
    let url =
        Url::parse(raw).map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" | "file" => Ok(url),
        scheme => Err(NavigationError::InvalidUrl(format!(
            "unsupported scheme '{}': {}",
            scheme, raw
        ))
        .into()),
    }
}

async fn navigate(page: &Page, url: &Url, timeout_ms: u64) -> Result<String> {
    let timeout = Duration::from_millis(timeout_ms);

    tokio::time::timeout(timeout, page.goto(url.as_str()))
        .await
        .map_err(|_| NavigationError::Timeout(timeout_ms))?
        .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

    wait_for_ready(page, timeout_ms).await?;

    let final_url = page
        .url()
        .await
        .map_err(|e| Error::cdp(e.to_string()))?
        .unwrap_or_else(|| url.to_string());

    debug!("Navigation complete: {} -> {}", url, final_url);
    Ok(final_url)
}

async fn wait_for_ready(page: &Page, timeout_ms: u64) -> Result<()> {
    let script = r#"
        new Promise(resolve => {
            if (document.readyState === 'complete') {
                resolve(true);
            } else {
                window.addEventListener('load', () => resolve(true));
            }
        })
    "#;

    let timeout = Duration::from_millis(timeout_ms);
    tokio::time::timeout(timeout, page.evaluate(script))
        .await
        .map_err(|_| NavigationError::Timeout(timeout_ms))?
        .map_err(|e| Error::cdp(e.to_string()))?;

    Ok(())
}

// ============================================================================
// Screenshot artifacts
// ============================================================================

fn sanitize_base(base: &str) -> String {
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() {
        "screenshot".to_string()
    } else {
        safe
    }
}

/// Pick a fresh artifact path for this timestamp. Existing files are never
/// overwritten: a same-second collision gets a numeric suffix instead.
fn artifact_path_with_stamp(dir: &Path, base: &str, stamp: &str) -> PathBuf {
    let safe = sanitize_base(base);
    let mut path = dir.join(format!("{}_{}.png", safe, stamp));
    let mut n = 1u32;
    while path.exists() {
        path = dir.join(format!("{}_{}_{}.png", safe, stamp, n));
        n += 1;
    }
    path
}

fn artifact_path(dir: &Path, base: &str) -> PathBuf {
    let stamp = chrono::Utc::now()
        .format("%Y-%m-%dT%H-%M-%S%.3fZ")
        .to_string()
        .replace('.', "-");
    artifact_path_with_stamp(dir, base, &stamp)
}

// ============================================================================
// Tool bodies
// ============================================================================

/// `open_browser`: launch (or reuse) the shared browser
pub(crate) async fn open_browser(session: &Session) -> ToolOutcome {
    let result = async {
        session.acquire().await?;
        Ok("Browser is open and ready".to_string())
    }
    .await;
    outcome("Failed to open browser", result)
}

/// `visit_url`: navigate the shared page
pub(crate) async fn visit_url(session: &Session, args: &Value) -> ToolOutcome {
    let raw = str_arg(args, "url");
    let result = async {
        let url = parse_url(raw)?;
        let page = session.acquire().await?;
        let final_url = navigate(&page, &url, session.config().nav_timeout_ms).await?;
        settle_nav().await;
        Ok(format!("Navigated to {}", final_url))
    }
    .await;
    outcome("Navigation failed", result)
}

const PAGE_INFO_SCRIPT: &str = r#"
(() => JSON.stringify({
    url: window.location.href,
    title: document.title,
    excerpt: (document.body ? document.body.innerText : '').trim().slice(0, 500),
}))()
"#;

/// `get_page_info`: current URL, title, and a visible-text excerpt
pub(crate) async fn get_page_info(session: &Session) -> ToolOutcome {
    let result = async {
        let page = session.acquire().await?;
        let raw: String = page
            .evaluate(PAGE_INFO_SCRIPT)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .into_value()
            .map_err(|e| Error::cdp(e.to_string()))?;
        let info: Value = serde_json::from_str(&raw)?;
        Ok(format!(
            "URL: {}\nTitle: {}\nVisible text: {}",
            info["url"].as_str().unwrap_or(""),
            info["title"].as_str().unwrap_or(""),
            info["excerpt"].as_str().unwrap_or(""),
        ))
    }
    .await;
    outcome("Failed to read page info", result)
}

/// `click_element`: click by exact selector
pub(crate) async fn click_element(session: &Session, args: &Value) -> ToolOutcome {
    let selector = str_arg(args, "selector").to_string();
    let result = async {
        let page = session.acquire().await?;
        let element = resolve::wait_for_selector(&page, &selector, ELEMENT_TIMEOUT_MS).await?;
        element.click().await.map_err(|e| Error::cdp(e.to_string()))?;
        settle_action().await;
        Ok(format!("Clicked element matching '{}'", selector))
    }
    .await;
    outcome("Click failed", result)
}

/// `click_by_text`: click through the text fallback chain
pub(crate) async fn click_by_text(session: &Session, args: &Value) -> ToolOutcome {
    let text = str_arg(args, "text").to_string();
    let result = async {
        let page = session.acquire().await?;
        let strategy = resolve::click_by_text(&page, &text).await?;
        settle_action().await;
        Ok(format!("Clicked '{}' via {}", text, strategy.describe()))
    }
    .await;
    outcome("Click failed", result)
}

/// `type_into`: type into a field located by exact selector
pub(crate) async fn type_into(session: &Session, args: &Value) -> ToolOutcome {
    let selector = str_arg(args, "selector").to_string();
    let text = str_arg(args, "text").to_string();
    let result = async {
        let page = session.acquire().await?;
        let element = resolve::wait_for_selector(&page, &selector, ELEMENT_TIMEOUT_MS).await?;
        element.click().await.map_err(|e| Error::cdp(e.to_string()))?;
        element
            .type_str(&text)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;
        settle_action().await;
        Ok(format!("Typed into element matching '{}'", selector))
    }
    .await;
    outcome("Typing failed", result)
}

/// `type_by_label`: type into the field best matching a human label
pub(crate) async fn type_by_label(session: &Session, args: &Value) -> ToolOutcome {
    let label = str_arg(args, "label").to_string();
    let value = str_arg(args, "value").to_string();
    let result = async {
        let page = session.acquire().await?;
        let matchers = resolve::default_matchers();
        let field = resolve::field_by_label(&page, &label, &matchers).await?;

        // Re-query with the same selector the enumeration script used, so
        // the descriptor index addresses the same element.
        let elements = page
            .find_elements(resolve::INPUT_LIKE_SELECTOR)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;
        let element = elements.get(field.index).ok_or_else(|| {
            Error::from(ResolveError::ScriptFailed(
                "field list changed while resolving".to_string(),
            ))
        })?;

        element.click().await.map_err(|e| Error::cdp(e.to_string()))?;
        element
            .type_str(&value)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?;
        settle_action().await;
        Ok(format!(
            "Typed into field '{}' (matched label '{}')",
            field.describe(),
            label
        ))
    }
    .await;
    outcome("Typing failed", result)
}

const GENERIC_SUBMIT_SELECTOR: &str = "button[type=\"submit\"], input[type=\"submit\"]";

/// Last-resort submit: drive the form owning the focused element, or fall
/// back to the first form on the page.
const SUBMIT_FALLBACK_SCRIPT: &str = r#"
(() => {
    const active = document.activeElement;
    const form = (active && active.form) || document.querySelector('form');
    if (!form) return false;
    if (form.requestSubmit) {
        form.requestSubmit();
    } else {
        form.submit();
    }
    return true;
})()
"#;

/// `submit_form`: named button, else generic submit control, else a
/// synthesized submit on the active form
pub(crate) async fn submit_form(session: &Session, args: &Value) -> ToolOutcome {
    let button_selector = args
        .get("button_selector")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let result = async {
        let page = session.acquire().await?;

        if let Some(selector) = &button_selector {
            if let Ok(element) =
                resolve::wait_for_selector(&page, selector, SUBMIT_BUTTON_TIMEOUT_MS).await
            {
                element.click().await.map_err(|e| Error::cdp(e.to_string()))?;
                settle_nav().await;
                return Ok(format!("Submitted via button '{}'", selector));
            }
            debug!("Named submit button '{}' not found, falling back", selector);
        }

        if let Ok(element) = page.find_element(GENERIC_SUBMIT_SELECTOR).await {
            element.click().await.map_err(|e| Error::cdp(e.to_string()))?;
            settle_nav().await;
            return Ok("Submitted via generic submit control".to_string());
        }

        let submitted: bool = page
            .evaluate(SUBMIT_FALLBACK_SCRIPT)
            .await
            .map_err(|e| Error::cdp(e.to_string()))?
            .into_value()
            .unwrap_or(false);
        if submitted {
            settle_nav().await;
            Ok("Submitted the active form".to_string())
        } else {
            Err(Error::generic("No form or submit control found on the page"))
        }
    }
    .await;
    outcome("Form submission failed", result)
}

/// `take_screenshot`: capture the page to a timestamped, write-once PNG
pub(crate) async fn take_screenshot(session: &Session, args: &Value) -> ToolOutcome {
    let base = args
        .get("filename")
        .and_then(|v| v.as_str())
        .unwrap_or("screenshot")
        .to_string();

    let result = async {
        let page = session.acquire().await?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .from_surface(true)
            .capture_beyond_viewport(true)
            .build();

        let data = page
            .screenshot(params)
            .await
            .map_err(|e| Error::from(CaptureError::ScreenshotFailed(e.to_string())))?;

        let dir = &session.config().screenshot_dir;
        tokio::fs::create_dir_all(dir).await?;
        let path = artifact_path(dir, &base);
        tokio::fs::write(&path, &data).await.map_err(|e| {
            Error::from(CaptureError::WriteFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;

        info!(path = %path.display(), bytes = data.len(), "Screenshot saved");
        Ok(format!(
            "Saved screenshot to {} ({} bytes)",
            path.display(),
            data.len()
        ))
    }
    .await;
    outcome("Screenshot failed", result)
}

/// `check_browser_status`: report session state without launching anything
pub(crate) async fn check_browser_status(session: &Session) -> ToolOutcome {
    let status = session.status().await;
    let message = match (status.open, status.connected) {
        (false, _) => "Browser is not open".to_string(),
        (true, false) => "Browser is open but disconnected; next call will relaunch".to_string(),
        (true, true) => match status.url {
            Some(url) => format!("Browser is open at {}", url),
            None => "Browser is open".to_string(),
        },
    };
    ToolOutcome::success(message)
}

/// `close_browser`: tear the session down, reporting per-step outcomes
pub(crate) async fn close_browser(session: &Session) -> ToolOutcome {
    let report = session.release().await;
    ToolOutcome::success(format!("Browser closed ({})", report.summary()))
}

// ============================================================================
// Tool definitions
// ============================================================================

/// Open (or reuse) the shared browser
pub struct OpenBrowserTool;

impl ToolSpec for OpenBrowserTool {
    fn name(&self) -> &str {
        "open_browser"
    }

    fn description(&self) -> &str {
        "Open the browser, or confirm the existing one is ready"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }
}

/// Navigate the shared page to a URL
pub struct VisitUrlTool;

impl ToolSpec for VisitUrlTool {
    fn name(&self) -> &str {
        "visit_url"
    }

    fn description(&self) -> &str {
        "Navigate the browser to a URL"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to navigate to (http, https, or file)"
                }
            },
            "required": ["url"]
        })
    }
}

/// Read the current page URL, title, and visible text
pub struct GetPageInfoTool;

impl ToolSpec for GetPageInfoTool {
    fn name(&self) -> &str {
        "get_page_info"
    }

    fn description(&self) -> &str {
        "Get the current page URL, title, and a visible-text excerpt"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }
}

/// Click an element by exact selector
pub struct ClickElementTool;

impl ToolSpec for ClickElementTool {
    fn name(&self) -> &str {
        "click_element"
    }

    fn description(&self) -> &str {
        "Click the element matching a CSS selector"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "selector": {
                    "type": "string",
                    "description": "CSS selector of the element to click"
                }
            },
            "required": ["selector"]
        })
    }
}

/// Click an element by visible text
pub struct ClickByTextTool;

impl ToolSpec for ClickByTextTool {
    fn name(&self) -> &str {
        "click_by_text"
    }

    fn description(&self) -> &str {
        "Click the element whose visible text or accessible name matches"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Visible text of the element to click"
                }
            },
            "required": ["text"]
        })
    }
}

/// Type into a field by exact selector
pub struct TypeIntoTool;

impl ToolSpec for TypeIntoTool {
    fn name(&self) -> &str {
        "type_into"
    }

    fn description(&self) -> &str {
        "Type text into the field matching a CSS selector"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "selector": {
                    "type": "string",
                    "description": "CSS selector of the input field"
                },
                "text": {
                    "type": "string",
                    "description": "The text to type"
                }
            },
            "required": ["selector", "text"]
        })
    }
}

/// Type into a field located by human label
pub struct TypeByLabelTool;

impl ToolSpec for TypeByLabelTool {
    fn name(&self) -> &str {
        "type_by_label"
    }

    fn description(&self) -> &str {
        "Type text into the input field best matching a human label \
         (placeholder, name, id, aria-label, or label text)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "label": {
                    "type": "string",
                    "description": "Human label of the field, e.g. 'password'"
                },
                "value": {
                    "type": "string",
                    "description": "The text to type"
                }
            },
            "required": ["label", "value"]
        })
    }
}

/// Submit the current form
pub struct SubmitFormTool;

impl ToolSpec for SubmitFormTool {
    fn name(&self) -> &str {
        "submit_form"
    }

    fn description(&self) -> &str {
        "Submit the current form: a named button if given, else any generic \
         submit control, else the active form directly"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "button_selector": {
                    "type": "string",
                    "description": "Optional CSS selector of the submit button"
                }
            },
            "required": []
        })
    }
}

/// Capture the page as a PNG artifact
pub struct TakeScreenshotTool;

impl ToolSpec for TakeScreenshotTool {
    fn name(&self) -> &str {
        "take_screenshot"
    }

    fn description(&self) -> &str {
        "Save a PNG screenshot of the current page to the artifact directory"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Base name for the file (default: 'screenshot')"
                }
            },
            "required": []
        })
    }
}

/// Report the browser session state
pub struct CheckBrowserStatusTool;

impl ToolSpec for CheckBrowserStatusTool {
    fn name(&self) -> &str {
        "check_browser_status"
    }

    fn description(&self) -> &str {
        "Check whether the browser is open and connected"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }
}

/// Close the browser session
pub struct CloseBrowserTool;

impl ToolSpec for CloseBrowserTool {
    fn name(&self) -> &str {
        "close_browser"
    }

    fn description(&self) -> &str {
        "Close the browser and release all session resources"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }
}
