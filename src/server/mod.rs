//! HTTP service boundary
//!
//! One command endpoint accepting `{prompt}` and returning
//! `{message, success}`, plus liveness and status endpoints. The end client
//! always receives a structured response, never a raw stack trace.

pub mod plan;

use crate::llm::InstructionRewriter;
use crate::session::{Session, SessionStatus};
use crate::tools::ToolRegistry;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{info, instrument};

/// Shared state for all handlers
pub struct AppState {
    /// The process-wide browser session
    pub session: Session,
    /// The tool catalog
    pub registry: ToolRegistry,
    /// The instruction rewriter
    pub rewriter: InstructionRewriter,
    started_at: Instant,
    commands_processed: AtomicU64,
    last_command: parking_lot::RwLock<Option<String>>,
}

impl AppState {
    /// Create the application state
    pub fn new(session: Session, registry: ToolRegistry, rewriter: InstructionRewriter) -> Self {
        Self {
            session,
            registry,
            rewriter,
            started_at: Instant::now(),
            commands_processed: AtomicU64::new(0),
            last_command: parking_lot::RwLock::new(None),
        }
    }
}

/// Build the service router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/command", post(command_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Request body for `/command`
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// The natural-language instruction
    pub prompt: String,
}

/// Response body for `/command`
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Rendered outcome lines for every tool call made
    pub message: String,
    /// Whether every tool call succeeded
    pub success: bool,
}

/// Error body for non-2xx responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// What went wrong
    pub error: String,
}

/// Liveness payload for `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Status payload for `/status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service name
    pub name: String,
    /// Service version
    pub version: String,
    /// Seconds since startup
    pub uptime_seconds: u64,
    /// Commands handled since startup
    pub commands_processed: u64,
    /// Most recent (rewritten) instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_command: Option<String>,
    /// Browser session state
    pub browser: SessionStatus,
    /// ISO8601 timestamp of this snapshot
    pub timestamp: String,
}

#[instrument(skip(state, request))]
async fn command_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> Response {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "prompt must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    info!("Handling command: {}", prompt);
    let instruction = state.rewriter.rewrite(prompt).await;

    state.commands_processed.fetch_add(1, Ordering::Relaxed);
    *state.last_command.write() = Some(instruction.clone());

    let (message, success) = run_instruction(&state, &instruction).await;
    Json(CommandResponse { message, success }).into_response()
}

/// Drive the planned tool sequence, stopping at the first failure or when
/// the turn budget runs out.
pub(crate) async fn run_instruction(state: &AppState, instruction: &str) -> (String, bool) {
    let steps = plan::plan_steps(instruction);
    let mut lines = Vec::with_capacity(steps.len());
    let mut success = true;

    for (name, args) in steps {
        let outcome = state.registry.execute(&state.session, &name, args).await;
        let ok = outcome.is_success();
        lines.push(outcome.render());
        if !ok {
            success = false;
            break;
        }
    }

    (lines.join("\n"), success)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    // Clone out of the lock before awaiting; the guard must not live across
    // an await point.
    let last_command = state.last_command.read().clone();
    Json(StatusResponse {
        name: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        commands_processed: state.commands_processed.load(Ordering::Relaxed),
        last_command,
        browser: state.session.status().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::RewriterConfig;
    use crate::session::BrowserConfig;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            Session::new(BrowserConfig::default()),
            ToolRegistry::new(),
            InstructionRewriter::new(RewriterConfig::default()),
        ))
    }

    #[test]
    fn test_health_response_default() {
        let health = HealthResponse::default();
        assert_eq!(health.status, "healthy");
    }

    #[tokio::test]
    async fn test_command_rejects_empty_prompt() {
        let response = command_handler(
            State(test_state()),
            Json(CommandRequest {
                prompt: "   ".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_command_status_prompt_succeeds_without_browser() {
        // No key is configured, so the rewriter passes the prompt through
        // and the planner picks the browser-free status tool.
        let state = test_state();
        let response = command_handler(
            State(state.clone()),
            Json(CommandRequest {
                prompt: "check the browser status".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.commands_processed.load(Ordering::Relaxed), 1);
        assert!(state.last_command.read().is_some());
    }

    #[tokio::test]
    async fn test_run_instruction_invalid_url_fails_cleanly() {
        // "go to htp://x" plans no URL step, so this falls through to
        // get_page_info, which needs a browser. Use a malformed visit via
        // the registry directly instead.
        let state = test_state();
        let outcome = state
            .registry
            .execute(
                &state.session,
                "visit_url",
                serde_json::json!({"url": "ftp://example.com"}),
            )
            .await;
        assert!(!outcome.is_success());
        assert!(outcome.render().starts_with("ERROR:"));
    }

    #[tokio::test]
    async fn test_status_handler_reports_closed_browser() {
        let state = test_state();
        let Json(status) = status_handler(State(state)).await;
        assert_eq!(status.name, crate::NAME);
        assert!(!status.browser.open);
        assert_eq!(status.commands_processed, 0);
    }
}
