//! Mock provider for local development and tests.

use super::{CompletionRequest, FinishReason, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Plan returned when no response text is configured.
const CANNED_PLAN: &str = r#"{"goal":"Build a daily habit","action_steps":[{"step":1,"action":"Pick a fixed time of day","reason":"Anchoring to a routine makes the habit automatic"},{"step":2,"action":"Start with five minutes","reason":"Small wins keep motivation up"}],"obstacles":[{"issue":"Missing a day","solution":"Never miss twice in a row"}]}"#;

enum Behavior {
    Text(String),
    Fail(String),
}

/// Mock text provider that records every request it receives.
pub struct MockTextProvider {
    behavior: Behavior,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl Default for MockTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTextProvider {
    /// Respond with a canned, well-formed plan.
    pub fn new() -> Self {
        Self::with_text(CANNED_PLAN)
    }

    /// Respond with `text` as the first content item.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Text(text.into()))
    }

    /// Fail every call with an API error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(message.into()))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|request| request.clone())
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        match &self.behavior {
            Behavior::Text(text) => Ok(ProviderResponse {
                text: text.clone(),
                input_tokens: (request.system.len() + request.prompt.len()) as u64 / 4,
                output_tokens: text.len() as u64 / 4,
                finish_reason: FinishReason::Complete,
            }),
            Behavior::Fail(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
