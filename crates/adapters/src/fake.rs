// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted LLM adapter for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::llm::{CompletionRequest, LlmAdapter, LlmError, Reply};

/// Replays queued replies in order; once the queue is empty, answers with
/// a fixed text message. Records every request for assertions.
pub struct FakeLlm {
    replies: Mutex<VecDeque<Result<Reply, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self { replies: Mutex::new(VecDeque::new()), requests: Mutex::new(Vec::new()) }
    }

    pub fn push_reply(&self, reply: Reply) {
        self.replies.lock().push_back(Ok(reply));
    }

    pub fn push_error(&self, error: LlmError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for FakeLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmAdapter for FakeLlm {
    async fn complete(&self, req: CompletionRequest) -> Result<Reply, LlmError> {
        self.requests.lock().push(req);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Reply::Message("The dolphins are listening.".to_string())))
    }
}
