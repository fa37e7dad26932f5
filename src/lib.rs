//! Webpilot - Natural-Language Browser Automation Service
//!
//! This crate drives a headless/headed browser on behalf of natural-language
//! instructions through a fixed catalog of schema-validated tools.
//!
//! # Architecture
//!
//! ```text
//! Client ──▶ HTTP /command ──▶ Rewriter (LLM) ──▶ Planner
//!                                                   │
//!                                                   ▼
//!                                            Tool Registry
//!                                            │          │
//!                                            ▼          ▼
//!                                    Session Manager  Element Resolution
//!                                    (one browser,    (selector / text /
//!                                     one page)        label fallbacks)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use webpilot::session::{BrowserConfig, Session};
//! use webpilot::tools::ToolRegistry;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = Session::new(BrowserConfig::default());
//!     let registry = ToolRegistry::new();
//!
//!     let outcome = registry
//!         .execute(&session, "visit_url", json!({"url": "https://example.com"}))
//!         .await;
//!     println!("{}", outcome.render());
//!
//!     session.release().await;
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod llm;
pub mod resolve;
pub mod server;
pub mod session;
pub mod tools;

// Re-exports for convenience
pub use error::{Error, Result};
pub use llm::{InstructionRewriter, RewriterConfig};
pub use session::{BrowserConfig, ReleaseReport, Session};
pub use tools::{ToolOutcome, ToolRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
