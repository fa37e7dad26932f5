//! Instruction rewriting via an OpenAI-compatible chat endpoint
//!
//! A thin collaborator: before planning, the raw user prompt is rewritten
//! into a terse imperative instruction. Any failure here (no key, transport
//! error, malformed response) degrades to the original instruction instead
//! of aborting the command.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const REWRITE_SYSTEM_PROMPT: &str = "You rewrite browsing instructions for a browser automation \
     agent. Rewrite the user's request into one short, unambiguous imperative sentence, keeping \
     every URL, label, and quoted text exactly as given. Respond with the rewritten instruction \
     only.";

/// Configuration for the rewriter endpoint
#[derive(Debug, Clone)]
pub struct RewriterConfig {
    /// Bearer token; None disables rewriting
    pub api_key: Option<String>,
    /// OpenAI-compatible API base, without trailing slash
    pub api_base: String,
    /// Model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RewriterConfig {
    /// Read configuration from the environment.
    ///
    /// `WEBPILOT_API_KEY` (falling back to `OPENAI_API_KEY`),
    /// `WEBPILOT_API_BASE`, `WEBPILOT_MODEL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("WEBPILOT_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok(),
            api_base: std::env::var("WEBPILOT_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            model: std::env::var("WEBPILOT_MODEL").unwrap_or(defaults.model),
            timeout_secs: defaults.timeout_secs,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Rewrites user prompts into terse browsing instructions
pub struct InstructionRewriter {
    client: reqwest::Client,
    config: RewriterConfig,
}

impl InstructionRewriter {
    /// Create a rewriter with the given configuration
    pub fn new(config: RewriterConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Rewrite an instruction, falling back to the original on any failure
    pub async fn rewrite(&self, instruction: &str) -> String {
        match self.try_rewrite(instruction).await {
            Ok(rewritten) if !rewritten.trim().is_empty() => {
                debug!("Instruction rewritten: {}", rewritten.trim());
                rewritten.trim().to_string()
            }
            Ok(_) => {
                warn!("Rewriter returned empty text, using original instruction");
                instruction.to_string()
            }
            Err(e) => {
                warn!("Instruction rewrite failed, using original: {}", e);
                instruction.to_string()
            }
        }
    }

    async fn try_rewrite(&self, instruction: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey)?;

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: REWRITE_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: instruction.to_string(),
                },
            ],
            temperature: 0.0,
            max_tokens: 200,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::RequestFailed(format!(
                "HTTP {} from rewriter endpoint",
                response.status()
            ))
            .into());
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::BadResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::BadResponse("no choices in response".to_string()).into())
    }
}
