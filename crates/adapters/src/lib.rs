// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! p42-adapters: external integrations.
//!
//! Today that is one thing: the LLM provider. The daemon and the engine
//! only see the [`LlmAdapter`] trait; the Anthropic implementation and the
//! scripted fake both live behind it.

mod anthropic;
#[cfg(any(test, feature = "test-support"))]
mod fake;
mod llm;

pub use anthropic::AnthropicLlm;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLlm;
pub use llm::{
    ArtifactSpec, ChatMessage, ChatRole, CommandSpec, CompletionRequest, LlmAdapter, LlmError,
    Reply,
};

use async_trait::async_trait;

/// Stand-in adapter when no API key is configured. Every completion
/// fails with `MissingApiKey`; the daemon stays up and path/relation
/// operations keep working.
pub struct UnconfiguredLlm;

#[async_trait]
impl LlmAdapter for UnconfiguredLlm {
    async fn complete(&self, _req: CompletionRequest) -> Result<Reply, LlmError> {
        Err(LlmError::MissingApiKey)
    }
}
