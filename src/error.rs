//! Error types for webpilot
//!
//! This module provides the error hierarchy shared by the session manager,
//! the element-resolution layer, and the tool catalog, using `thiserror`.

use thiserror::Error;

/// The main error type for webpilot operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Element resolution errors
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Screenshot capture errors
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Language-model collaborator errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create the session page
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// Session initialization did not complete in time
    #[error("Session initialization timed out after {0}ms")]
    InitTimeout(u64),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),
}

/// Element resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Selector did not attach within the timeout
    #[error("No element matched selector '{selector}' within {timeout_ms}ms")]
    SelectorTimeout {
        /// The selector that was polled
        selector: String,
        /// The poll deadline in milliseconds
        timeout_ms: u64,
    },

    /// The driver rejected the selector itself
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector {
        /// The rejected selector
        selector: String,
        /// Driver error text
        message: String,
    },

    /// All text-click strategies were exhausted
    #[error("No clickable element matches text '{0}'")]
    NoTextMatch(String),

    /// No input-like element matched the label heuristics
    #[error("No input field found for label '{0}'")]
    NoLabelMatch(String),

    /// Injected resolution script failed
    #[error("Resolution script failed: {0}")]
    ScriptFailed(String),
}

/// Screenshot capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Screenshot capture failed in the driver
    #[error("Screenshot capture failed: {0}")]
    ScreenshotFailed(String),

    /// Writing the artifact to disk failed
    #[error("Failed to write screenshot '{path}': {message}")]
    WriteFailed {
        /// Target path of the artifact
        path: String,
        /// Underlying I/O message
        message: String,
    },
}

/// Language-model collaborator errors
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key configured
    #[error("No API key configured for the language model")]
    MissingApiKey,

    /// HTTP transport failure
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// Response did not contain a usable completion
    #[error("Malformed LLM response: {0}")]
    BadResponse(String),
}

/// Result type alias for webpilot operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Session(SessionError::LaunchFailed("no chrome".to_string()));
        assert!(err.to_string().contains("Failed to launch browser"));
        assert!(err.to_string().contains("no chrome"));
    }

    #[test]
    fn test_resolve_error_text() {
        let err = ResolveError::NoTextMatch("Submit".to_string());
        assert_eq!(
            err.to_string(),
            "No clickable element matches text 'Submit'"
        );
    }

    #[test]
    fn test_resolve_error_label() {
        let err = ResolveError::NoLabelMatch("username".to_string());
        assert!(err.to_string().contains("No input field found"));
    }

    #[test]
    fn test_invalid_selector_display() {
        let err = ResolveError::InvalidSelector {
            selector: "div[".to_string(),
            message: "syntax error".to_string(),
        };
        assert!(err.to_string().contains("Invalid selector"));
        assert!(err.to_string().contains("div["));
    }

    #[test]
    fn test_selector_timeout_display() {
        let err = ResolveError::SelectorTimeout {
            selector: "#login".to_string(),
            timeout_ms: 5000,
        };
        assert!(err.to_string().contains("#login"));
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn test_init_timeout() {
        let err = SessionError::InitTimeout(30000);
        assert!(err.to_string().contains("30000"));
    }

    #[test]
    fn test_generic_error() {
        let err = Error::generic("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }
}
