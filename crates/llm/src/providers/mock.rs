//! Mock LLM provider for tests, demos and offline development.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use agriqa_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Longest prompt excerpt an echo reply repeats.
const ECHO_EXCERPT_CHARS: usize = 240;

/// One canned reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text
    Text(String),

    /// Fail with an LLM error carrying this message
    Fail(String),

    /// Repeat an excerpt of the prompt
    Echo,
}

/// Deterministic LLM client.
///
/// Replies are taken from a script in order; once the script is empty the
/// fallback reply is used for every further call. Every request is recorded
/// so tests can inspect the prompts that were sent.
#[derive(Debug)]
pub struct MockClient {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    calls: Mutex<Vec<LlmRequest>>,
}

impl MockClient {
    /// Client that echoes every prompt.
    pub fn echo() -> Self {
        Self::with_script(Vec::new(), MockReply::Echo)
    }

    /// Client that returns the same text for every call.
    pub fn always(text: impl Into<String>) -> Self {
        Self::with_script(Vec::new(), MockReply::Text(text.into()))
    }

    /// Client whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Vec::new(), MockReply::Fail(message.into()))
    }

    /// Client that plays `replies` in order, then echoes.
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self::with_script(replies, MockReply::Echo)
    }

    /// Client that plays `replies` in order, then repeats `fallback`.
    pub fn with_script(replies: impl IntoIterator<Item = MockReply>, fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn calls(&self) -> Vec<LlmRequest> {
        lock(&self.calls).clone()
    }

    fn next_reply(&self) -> MockReply {
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        lock(&self.calls).push(request.clone());

        let content = match self.next_reply() {
            MockReply::Text(text) => text,
            MockReply::Fail(message) => return Err(AppError::Llm(message)),
            MockReply::Echo => {
                let excerpt: String = request.prompt.chars().take(ECHO_EXCERPT_CHARS).collect();
                format!("[mock:{}] {}", request.model, excerpt)
            }
        };

        let prompt_tokens = request.prompt.split_whitespace().count() as u32;
        let completion_tokens = content.split_whitespace().count() as u32;

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(prompt_tokens, completion_tokens),
        })
    }
}
