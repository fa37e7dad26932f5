//! Keyword planner for the `/command` endpoint
//!
//! Maps a rewritten instruction onto a bounded sequence of tool calls. The
//! real planning policy belongs to the external orchestration loop; this
//! seam exists so the endpoint works standalone and stays testable.

use serde_json::{json, Value};

/// Maximum tool calls driven by one command
pub const TURN_BUDGET: usize = 8;

/// Derive the tool sequence for an instruction
pub fn plan_steps(instruction: &str) -> Vec<(String, Value)> {
    let lower = instruction.to_lowercase();
    let mut steps: Vec<(String, Value)> = Vec::new();

    if lower.contains("close") && lower.contains("browser") {
        return vec![("close_browser".to_string(), json!({}))];
    }

    if let Some(url) = extract_url(instruction) {
        steps.push(("visit_url".to_string(), json!({ "url": url })));
    }

    if let Some((value, label)) = extract_typing(instruction) {
        steps.push((
            "type_by_label".to_string(),
            json!({ "label": label, "value": value }),
        ));
    }

    if lower.contains("click") {
        if let Some(text) = first_quoted_after(instruction, "click") {
            steps.push(("click_by_text".to_string(), json!({ "text": text })));
        }
    }

    if lower.contains("submit") {
        steps.push(("submit_form".to_string(), json!({})));
    }

    if lower.contains("screenshot") {
        let filename = first_quoted_after(instruction, "screenshot");
        let args = match filename {
            Some(name) => json!({ "filename": name }),
            None => json!({}),
        };
        steps.push(("take_screenshot".to_string(), args));
    }

    if steps.is_empty() {
        let fallback = if lower.contains("status") {
            "check_browser_status"
        } else if lower.contains("open") || lower.contains("start") || lower.contains("launch") {
            "open_browser"
        } else {
            "get_page_info"
        };
        steps.push((fallback.to_string(), json!({})));
    }

    steps.truncate(TURN_BUDGET);
    steps
}

/// First URL-looking token, with a `www.` shorthand upgraded to https
fn extract_url(instruction: &str) -> Option<String> {
    for token in instruction.split_whitespace() {
        let token = token.trim_matches(|c: char| "\"'.,;!?()".contains(c));
        if token.starts_with("http://") || token.starts_with("https://") {
            return Some(token.to_string());
        }
        if token.starts_with("www.") && token.len() > 4 {
            return Some(format!("https://{}", token));
        }
    }
    None
}

/// Parse `type "VALUE" into LABEL` shapes into (value, label)
fn extract_typing(instruction: &str) -> Option<(String, String)> {
    let lower = instruction.to_lowercase();
    let verb = ["type", "enter", "fill"]
        .iter()
        .find(|v| lower.contains(**v))?;
    let value = first_quoted_after(instruction, verb)?;

    let into_pos = lower.find(" into ")?;
    let mut tail = &instruction[into_pos + 6..];
    // The label ends where the next clause begins.
    for stop in [" and ", " then ", ","] {
        if let Some(pos) = tail.to_lowercase().find(stop) {
            tail = &tail[..pos];
        }
    }
    let mut label = tail.trim();
    for prefix in ["the ", "a "] {
        if let Some(rest) = label.strip_prefix(prefix) {
            label = rest;
        }
    }
    let label = label
        .trim_end_matches(|c: char| ".,;!?".contains(c))
        .trim_end();
    let label = label
        .strip_suffix(" field")
        .or_else(|| label.strip_suffix(" box"))
        .or_else(|| label.strip_suffix(" input"))
        .unwrap_or(label)
        .trim_matches(|c: char| "\"'".contains(c));

    if label.is_empty() {
        return None;
    }
    Some((value, label.to_string()))
}

/// First single- or double-quoted span after a keyword (case-insensitive)
fn first_quoted_after(instruction: &str, keyword: &str) -> Option<String> {
    let lower = instruction.to_lowercase();
    let start = lower.find(&keyword.to_lowercase())? + keyword.len();
    let rest = &instruction[start..];

    let open = rest.find(['"', '\''])?;
    let quote = rest[open..].chars().next()?;
    let body = &rest[open + 1..];
    let close = body.find(quote)?;
    let text = &body[..close];
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
