// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The LLM client contract.
//!
//! A completion either comes back as plain text or as a structured
//! crystallization: a command spec or an artifact spec. The provider is
//! out of scope; this is the contract it must satisfy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who said a turn, from the provider's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One conversation turn sent to the provider.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// A completion request: system preamble plus the conversation so far.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    /// Offer the crystallization tool schema to the model.
    pub allow_tools: bool,
}

/// Structured spec for a generated command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    pub implementation: String,
}

/// Structured spec for a generated artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub artifact_type: String,
    #[serde(default)]
    pub format: String,
    pub content: String,
}

/// What the model answered: a sum type over text and tool invocations.
#[derive(Debug, Clone)]
pub enum Reply {
    Message(String),
    Command { message: Option<String>, spec: CommandSpec },
    Artifact { message: Option<String>, spec: ArtifactSpec },
}

impl Reply {
    /// The conversational text of the reply, whatever its shape.
    pub fn text(&self) -> &str {
        match self {
            Reply::Message(m) => m,
            Reply::Command { message, .. } | Reply::Artifact { message, .. } => {
                message.as_deref().unwrap_or("")
            }
        }
    }

    pub fn command_spec(&self) -> Option<&CommandSpec> {
        match self {
            Reply::Command { spec, .. } => Some(spec),
            _ => None,
        }
    }

    pub fn artifact_spec(&self) -> Option<&ArtifactSpec> {
        match self {
            Reply::Artifact { spec, .. } => Some(spec),
            _ => None,
        }
    }
}

/// Errors from the provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured (set PORT42_API_KEY or ANTHROPIC_API_KEY)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),
}

/// The seam between the daemon and whichever model is on the other side.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<Reply, LlmError>;
}
