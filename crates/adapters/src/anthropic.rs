// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Anthropic Messages API adapter.
//!
//! System text goes in the top-level `system` field; crystallization is
//! offered to the model as two tools whose `tool_use` blocks parse
//! straight into [`CommandSpec`] / [`ArtifactSpec`]. Requests are paced
//! by a small rate-limit reservation and retried with exponential backoff
//! on network errors, 429, and 5xx.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::llm::{
    ArtifactSpec, ChatRole, CommandSpec, CompletionRequest, LlmAdapter, LlmError, Reply,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);
const MAX_RETRIES: u32 = 3;
/// First backoff; doubles per retry (2 s, 4 s, 8 s).
const BACKOFF_BASE: Duration = Duration::from_secs(2);
/// Minimum spacing between request starts.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(500);

pub struct AnthropicLlm {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    /// Rate-limit bookkeeping only; the network call itself is not
    /// serialized behind this lock.
    next_allowed: Mutex<Instant>,
}

impl AnthropicLlm {
    /// Build from `PORT42_API_KEY` / `ANTHROPIC_API_KEY` and optional
    /// `P42_MODEL` / `P42_LLM_TIMEOUT_MS` overrides.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("PORT42_API_KEY")
            .or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let model = std::env::var("P42_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout = std::env::var("P42_LLM_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self::new(DEFAULT_BASE_URL, api_key, model, timeout)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            next_allowed: Mutex::new(Instant::now()),
        })
    }

    /// Reserve a request slot, returning how long to sleep first.
    fn reserve_slot(&self) -> Duration {
        let mut next = self.next_allowed.lock();
        let now = Instant::now();
        let wait = next.saturating_duration_since(now);
        *next = now.max(*next) + MIN_REQUEST_INTERVAL;
        wait
    }

    fn build_body(&self, req: &CompletionRequest) -> Value {
        let messages: Vec<Value> = req
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": messages,
        });
        if !req.system.is_empty() {
            body["system"] = Value::String(req.system.clone());
        }
        if req.allow_tools {
            body["tools"] = crystallization_tools();
        }
        body
    }

    async fn send_once(&self, body: &Value) -> Result<Value, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }
        response.json().await.map_err(|e| LlmError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl LlmAdapter for AnthropicLlm {
    async fn complete(&self, req: CompletionRequest) -> Result<Reply, LlmError> {
        let wait = self.reserve_slot();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let body = self.build_body(&req);
        let mut last_error = LlmError::RetriesExhausted("no attempt made".to_string());

        for attempt in 0..=MAX_RETRIES {
            match self.send_once(&body).await {
                Ok(json) => return parse_reply(&json),
                Err(e) if retryable(&e) && attempt < MAX_RETRIES => {
                    let backoff = BACKOFF_BASE * 2u32.pow(attempt);
                    warn!(attempt, error = %e, backoff_secs = backoff.as_secs(), "LLM request failed, retrying");
                    tokio::time::sleep(backoff).await;
                    last_error = e;
                }
                Err(e) if retryable(&e) => {
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(LlmError::RetriesExhausted(last_error.to_string()))
    }
}

/// Retry only on network errors, 429, and 5xx.
fn retryable(e: &LlmError) -> bool {
    match e {
        LlmError::Http(_) => true,
        LlmError::Status(429) => true,
        LlmError::Status(code) => *code >= 500,
        _ => false,
    }
}

/// Tool schema offered for crystallization.
fn crystallization_tools() -> Value {
    json!([
        {
            "name": "crystallize_command",
            "description": "Create a new executable command from this conversation.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "language": { "type": "string" },
                    "implementation": { "type": "string" }
                },
                "required": ["name", "implementation"]
            }
        },
        {
            "name": "crystallize_artifact",
            "description": "Create a document, design, or other artifact from this conversation.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "type": { "type": "string" },
                    "format": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["name", "content"]
            }
        }
    ])
}

/// Fold the content blocks of a response into a [`Reply`].
fn parse_reply(json: &Value) -> Result<Reply, LlmError> {
    let blocks = json
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Malformed("response has no content array".to_string()))?;

    let mut text = String::new();
    let mut command: Option<CommandSpec> = None;
    let mut artifact: Option<ArtifactSpec> = None;

    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(t) = block.get("text").and_then(Value::as_str) {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(t);
                }
            }
            Some("tool_use") => {
                let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
                let input = block.get("input").cloned().unwrap_or(Value::Null);
                match name {
                    "crystallize_command" => {
                        command = Some(
                            serde_json::from_value(input)
                                .map_err(|e| LlmError::Malformed(e.to_string()))?,
                        );
                    }
                    "crystallize_artifact" => {
                        artifact = Some(
                            serde_json::from_value(input)
                                .map_err(|e| LlmError::Malformed(e.to_string()))?,
                        );
                    }
                    other => debug!(tool = other, "ignoring unknown tool invocation"),
                }
            }
            _ => {}
        }
    }

    let message = if text.is_empty() { None } else { Some(text.clone()) };
    if let Some(spec) = command {
        return Ok(Reply::Command { message, spec });
    }
    if let Some(spec) = artifact {
        return Ok(Reply::Artifact { message, spec });
    }
    Ok(Reply::Message(text))
}

#[cfg(test)]
#[path = "anthropic_tests.rs"]
mod tests;
