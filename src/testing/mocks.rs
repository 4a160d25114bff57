//! Scriptable reasoning-provider mock

use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmError, LlmProvider, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// An in-memory provider that replays scripted replies in order
///
/// When the script runs out, further calls fail with an API error. The
/// failing variant rejects every call, which exercises the agents'
/// synthetic fallback path.
pub struct MockProvider {
    replies: Mutex<VecDeque<String>>,
    fail_all: bool,
    calls: AtomicU64,
}

impl MockProvider {
    pub fn scripted(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            fail_all: false,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fail_all: true,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_all {
            return Err(LlmError::ApiError("scripted failure".to_string()));
        }

        let reply = self
            .replies
            .lock()
            .expect("mock replies poisoned")
            .pop_front()
            .ok_or_else(|| LlmError::ApiError("script exhausted".to_string()))?;

        Ok(CompletionResponse {
            content: reply,
            model: request.model,
            usage: TokenUsage {
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
            },
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.fail_all {
            Err(LlmError::ApiError("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }
}
