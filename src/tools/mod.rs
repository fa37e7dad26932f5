//! Tool catalog and dispatch
//!
//! Tools are the fixed, schema-validated operations exposed to the planning
//! loop. Every tool body is a failure boundary: arguments are validated
//! before any browser action, and no driver error crosses a tool's surface
//! as anything but a failure outcome.

pub mod catalog;

use crate::session::Session;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Tagged result of a tool call.
///
/// The planning loop and tests branch on the variant; `render()` provides
/// the human-readable string form carried back to the language model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutcome {
    /// The tool completed its action
    Success {
        /// Human-readable outcome
        message: String,
    },
    /// The tool failed; the browser state is whatever the partial action left
    Failure {
        /// Human-readable failure description
        message: String,
        /// Underlying driver/validation message, preserved for diagnosis
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl ToolOutcome {
    /// Create a success outcome
    pub fn success(message: impl Into<String>) -> Self {
        ToolOutcome::Success {
            message: message.into(),
        }
    }

    /// Create a failure outcome
    pub fn failure(message: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            message: message.into(),
            detail: None,
        }
    }

    /// Create a failure outcome preserving the underlying error text
    pub fn failure_with(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// Whether this is the success variant
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// The outcome message, without the marker prefix
    pub fn message(&self) -> &str {
        match self {
            ToolOutcome::Success { message } => message,
            ToolOutcome::Failure { message, .. } => message,
        }
    }

    /// Render the single-line string handed back to the planning loop
    pub fn render(&self) -> String {
        match self {
            ToolOutcome::Success { message } => format!("OK: {}", message),
            ToolOutcome::Failure {
                message,
                detail: Some(detail),
            } => format!("ERROR: {} ({})", message, detail),
            ToolOutcome::Failure {
                message,
                detail: None,
            } => format!("ERROR: {}", message),
        }
    }
}

/// A catalog tool: name, description, and JSON-schema-shaped argument record
pub trait ToolSpec: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;
    /// Tool description shown to the planner
    fn description(&self) -> &str;
    /// Input schema as JSON
    fn input_schema(&self) -> Value;
    /// Get the tool definition
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Serializable tool definition handed to the planner
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Input JSON schema
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Validate an argument record against a tool's declared schema.
///
/// Checks the `required` list and that declared string properties are
/// strings. Runs before any browser action; a rejection here means no side
/// effect fired.
pub fn validate_args(schema: &Value, args: &Value) -> std::result::Result<(), String> {
    if !args.is_object() && !args.is_null() {
        return Err("Arguments must be a JSON object".to_string());
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            let present = args
                .get(key)
                .map(|v| !v.is_null() && v.as_str().map(|s| !s.is_empty()).unwrap_or(true))
                .unwrap_or(false);
            if !present {
                return Err(format!("Missing required parameter: {}", key));
            }
        }
    }

    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, prop) in props {
            if let Some(value) = args.get(key) {
                if prop.get("type").and_then(|t| t.as_str()) == Some("string")
                    && !value.is_string()
                    && !value.is_null()
                {
                    return Err(format!("Parameter '{}' must be a string", key));
                }
            }
        }
    }

    Ok(())
}

/// Registry holding the fixed tool catalog
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn ToolSpec>>,
}

impl ToolRegistry {
    /// Create a registry with all built-in tools
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Box::new(catalog::OpenBrowserTool));
        registry.register(Box::new(catalog::VisitUrlTool));
        registry.register(Box::new(catalog::GetPageInfoTool));
        registry.register(Box::new(catalog::ClickElementTool));
        registry.register(Box::new(catalog::ClickByTextTool));
        registry.register(Box::new(catalog::TypeIntoTool));
        registry.register(Box::new(catalog::TypeByLabelTool));
        registry.register(Box::new(catalog::SubmitFormTool));
        registry.register(Box::new(catalog::TakeScreenshotTool));
        registry.register(Box::new(catalog::CheckBrowserStatusTool));
        registry.register(Box::new(catalog::CloseBrowserTool));

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Box<dyn ToolSpec>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Whether a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Execute a tool by name against the shared session.
    ///
    /// Arguments are validated first; the browser is never touched on a
    /// validation failure.
    #[instrument(skip(self, session, args))]
    pub async fn execute(&self, session: &Session, name: &str, args: Value) -> ToolOutcome {
        info!("Executing tool: {}", name);

        let Some(tool) = self.tools.get(name) else {
            return ToolOutcome::failure(format!("Unknown tool: {}", name));
        };

        if let Err(message) = validate_args(&tool.input_schema(), &args) {
            return ToolOutcome::failure(message);
        }

        match name {
            "open_browser" => catalog::open_browser(session).await,
            "visit_url" => catalog::visit_url(session, &args).await,
            "get_page_info" => catalog::get_page_info(session).await,
            "click_element" => catalog::click_element(session, &args).await,
            "click_by_text" => catalog::click_by_text(session, &args).await,
            "type_into" => catalog::type_into(session, &args).await,
            "type_by_label" => catalog::type_by_label(session, &args).await,
            "submit_form" => catalog::submit_form(session, &args).await,
            "take_screenshot" => catalog::take_screenshot(session, &args).await,
            "check_browser_status" => catalog::check_browser_status(session).await,
            "close_browser" => catalog::close_browser(session).await,
            _ => ToolOutcome::failure(format!("Unknown tool: {}", name)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of all catalog tools, in contract order
pub const AVAILABLE_TOOLS: &[&str] = &[
    "open_browser",
    "visit_url",
    "get_page_info",
    "click_element",
    "click_by_text",
    "type_into",
    "type_by_label",
    "submit_form",
    "take_screenshot",
    "check_browser_status",
    "close_browser",
];
