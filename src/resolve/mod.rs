//! Element resolution strategies
//!
//! Pages rarely expose stable selectors to an instruction-following agent.
//! This module turns an exact selector, a visible-text string, or a human
//! label into an actionable element through ordered fallback chains. Every
//! strategy is individually time-bounded so a missing element fails the call
//! instead of stalling it.

pub mod label;

use crate::error::{Result, ResolveError};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

pub use label::{default_matchers, FieldDescriptor, LabelMatcher};

/// Interval between attach polls in [`wait_for_selector`]
const POLL_INTERVAL_MS: u64 = 100;

/// Per-strategy timeout in the text-click fallback chain
const STRATEGY_TIMEOUT_MS: u64 = 1500;

/// Selector covering every input-like element, in document order. The order
/// matches the enumeration script in [`label`], which is what makes
/// descriptor indices usable as element indices.
pub const INPUT_LIKE_SELECTOR: &str = "input, textarea, select";

/// Wait for a selector to attach, polling on a short interval.
///
/// Only "no node matched" is retried; a selector the driver rejects
/// outright fails immediately. The timeout is a reported failure, not a
/// crash.
#[instrument(skip(page))]
pub async fn wait_for_selector(page: &Page, selector: &str, timeout_ms: u64) -> Result<Element> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        match page.find_element(selector).await {
            Ok(element) => return Ok(element),
            Err(CdpError::NotFound) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(CdpError::NotFound) => {
                return Err(ResolveError::SelectorTimeout {
                    selector: selector.to_string(),
                    timeout_ms,
                }
                .into())
            }
            Err(e) => {
                return Err(ResolveError::InvalidSelector {
                    selector: selector.to_string(),
                    message: e.to_string(),
                }
                .into())
            }
        }
    }
}

/// Which fallback located the element in [`click_by_text`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickStrategy {
    /// Exact visible-text match
    ExactText,
    /// Partial visible-text match
    PartialText,
    /// Accessible role "button" with matching name
    ButtonRole,
    /// Accessible role "link" with matching name
    LinkRole,
}

impl ClickStrategy {
    /// Human-readable strategy name for outcome messages
    pub fn describe(&self) -> &'static str {
        match self {
            ClickStrategy::ExactText => "exact text match",
            ClickStrategy::PartialText => "partial text match",
            ClickStrategy::ButtonRole => "button role match",
            ClickStrategy::LinkRole => "link role match",
        }
    }
}

/// Click the first element whose visible text or accessible name matches.
///
/// Strategies run in order: exact text, partial text, button role, link
/// role. Each attempt has its own short timeout and swallowed failure; only
/// after all four are exhausted does the call fail.
#[instrument(skip(page))]
pub async fn click_by_text(page: &Page, text: &str) -> Result<ClickStrategy> {
    let strategies = [
        (ClickStrategy::ExactText, exact_text_script(text)),
        (ClickStrategy::PartialText, partial_text_script(text)),
        (ClickStrategy::ButtonRole, role_script(text, BUTTON_ROLE_SELECTOR)),
        (ClickStrategy::LinkRole, role_script(text, LINK_ROLE_SELECTOR)),
    ];

    for (strategy, script) in strategies {
        let attempt = tokio::time::timeout(
            Duration::from_millis(STRATEGY_TIMEOUT_MS),
            page.evaluate(script.as_str()),
        )
        .await;

        match attempt {
            Ok(Ok(result)) => {
                if result.into_value::<bool>().unwrap_or(false) {
                    debug!(strategy = strategy.describe(), "Text click resolved");
                    return Ok(strategy);
                }
            }
            Ok(Err(e)) => debug!(strategy = strategy.describe(), "Strategy failed: {}", e),
            Err(_) => debug!(strategy = strategy.describe(), "Strategy timed out"),
        }
    }

    Err(ResolveError::NoTextMatch(text.to_string()).into())
}

const CLICKABLE_SELECTOR: &str = "a, button, [role=\"button\"], [role=\"link\"], \
     input[type=\"submit\"], input[type=\"button\"], summary, label, span, div";

const BUTTON_ROLE_SELECTOR: &str =
    "button, [role=\"button\"], input[type=\"submit\"], input[type=\"button\"]";

const LINK_ROLE_SELECTOR: &str = "a[href], [role=\"link\"]";

/// Embed user text as a JS string literal
fn js_literal(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

fn exact_text_script(text: &str) -> String {
    format!(
        r#"
        (() => {{
            const wanted = {wanted}.trim();
            const nodes = document.querySelectorAll('{selector}');
            for (const el of nodes) {{
                const text = (el.innerText || el.textContent || el.value || '').trim();
                if (text === wanted && el.offsetParent !== null) {{
                    el.click();
                    return true;
                }}
            }}
            return false;
        }})()
        "#,
        wanted = js_literal(text),
        selector = CLICKABLE_SELECTOR,
    )
}

fn partial_text_script(text: &str) -> String {
    format!(
        r#"
        (() => {{
            const wanted = {wanted}.trim().toLowerCase();
            const nodes = document.querySelectorAll('{selector}');
            for (const el of nodes) {{
                const text = (el.innerText || el.textContent || el.value || '')
                    .trim().toLowerCase();
                if (text.length > 0 && text.length < 200 && text.includes(wanted)
                    && el.offsetParent !== null) {{
                    el.click();
                    return true;
                }}
            }}
            return false;
        }})()
        "#,
        wanted = js_literal(text),
        selector = CLICKABLE_SELECTOR,
    )
}

fn role_script(text: &str, role_selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const wanted = {wanted}.trim().toLowerCase();
            const nodes = document.querySelectorAll('{selector}');
            for (const el of nodes) {{
                const name = (el.innerText || el.value
                    || el.getAttribute('aria-label') || '').trim().toLowerCase();
                if (name.includes(wanted)) {{
                    el.click();
                    return true;
                }}
            }}
            return false;
        }})()
        "#,
        wanted = js_literal(text),
        selector = role_selector,
    )
}

/// Locate the input-like field best matching a human label.
///
/// Descriptors are scraped from the live page on every call and never
/// cached, because the page may have mutated since the last call.
#[instrument(skip(page, matchers))]
pub async fn field_by_label(
    page: &Page,
    label_text: &str,
    matchers: &[Box<dyn LabelMatcher>],
) -> Result<FieldDescriptor> {
    let raw: String = page
        .evaluate(label::ENUMERATE_FIELDS_SCRIPT)
        .await
        .map_err(|e| ResolveError::ScriptFailed(e.to_string()))?
        .into_value()
        .map_err(|e| ResolveError::ScriptFailed(e.to_string()))?;

    let candidates: Vec<FieldDescriptor> =
        serde_json::from_str(&raw).map_err(|e| ResolveError::ScriptFailed(e.to_string()))?;

    debug!(candidates = candidates.len(), "Enumerated input-like fields");

    label::select_field(label_text, &candidates, matchers)
        .cloned()
        .ok_or_else(|| ResolveError::NoLabelMatch(label_text.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_literal_escapes_quotes() {
        let lit = js_literal(r#"Sign "up" now"#);
        assert_eq!(lit, r#""Sign \"up\" now""#);
    }

    #[test]
    fn test_exact_text_script_embeds_text() {
        let script = exact_text_script("Submit");
        assert!(script.contains("\"Submit\""));
        assert!(script.contains("text === wanted"));
    }

    #[test]
    fn test_partial_script_lowercases() {
        let script = partial_text_script("Log In");
        assert!(script.contains("toLowerCase()"));
        assert!(script.contains("includes(wanted)"));
    }

    #[test]
    fn test_role_scripts_use_role_selectors() {
        let button = role_script("Go", BUTTON_ROLE_SELECTOR);
        assert!(button.contains("input[type=\"submit\"]"));
        let link = role_script("Go", LINK_ROLE_SELECTOR);
        assert!(link.contains("a[href]"));
    }

    #[test]
    fn test_strategy_describe() {
        assert_eq!(ClickStrategy::ExactText.describe(), "exact text match");
        assert_eq!(ClickStrategy::LinkRole.describe(), "link role match");
    }
}
