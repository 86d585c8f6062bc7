//! In-memory model client that replays queued responses.
//!
//! Used by the tests in place of a network client. Every prompt it receives
//! is recorded so callers can inspect what was sent.

use super::{ModelClient, ModelResponse};
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

enum Scripted {
    Respond(ModelResponse),
    Fail(String),
}

/// A [`ModelClient`] that answers from a queue.
///
/// Clones share the same queue and prompt log.
#[derive(Clone, Default)]
pub struct ScriptedModelClient {
    queue: Arc<Mutex<VecDeque<Scripted>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    fallback: Option<Arc<dyn Fn(&str) -> ModelResponse + Send + Sync>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that answers every prompt with `respond(prompt)` once the
    /// queue is empty.
    pub fn with_fallback<F>(respond: F) -> Self
    where
        F: Fn(&str) -> ModelResponse + Send + Sync + 'static,
    {
        Self {
            fallback: Some(Arc::new(respond)),
            ..Self::default()
        }
    }

    /// Queue a response.
    pub fn push_response(&self, response: ModelResponse) -> &Self {
        self.queue.lock().push_back(Scripted::Respond(response));
        self
    }

    /// Queue an assistant message with the given text.
    pub fn push_message(&self, content: impl Into<String>) -> &Self {
        self.push_response(ModelResponse::message(content))
    }

    /// Queue a client-side failure.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.queue.lock().push_back(Scripted::Fail(message.into()));
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of `invoke` calls so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

impl ModelClient for ScriptedModelClient {
    fn invoke(&self, prompt: &str) -> Result<ModelResponse> {
        self.prompts.lock().push(prompt.to_string());

        match self.queue.lock().pop_front() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(anyhow!(message)),
            None => match &self.fallback {
                Some(respond) => Ok(respond(prompt)),
                None => Err(anyhow!("no scripted response available")),
            },
        }
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}
