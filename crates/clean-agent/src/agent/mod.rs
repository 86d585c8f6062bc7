//! The cleaning agent: one model call per [`CleaningState`].
//!
//! There is a single step (prompt in, normalized text out), so the agent is a
//! plain function over a [`ModelClient`] and a [`ResponseNormalizer`].

mod normalizer;

pub use normalizer::{ContentStrategy, FieldContent, MappingContent, ResponseNormalizer};

use crate::ai::ModelClient;
use crate::error::{CleaningError, Result};
use crate::types::CleaningState;
use std::sync::Arc;
use tracing::debug;

/// Runs one prompt through a model client and normalizes the answer.
pub struct CleaningAgent {
    client: Arc<dyn ModelClient>,
    normalizer: ResponseNormalizer,
}

impl CleaningAgent {
    /// Agent with the default normalization order.
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self::with_normalizer(client, ResponseNormalizer::default())
    }

    pub fn with_normalizer(client: Arc<dyn ModelClient>, normalizer: ResponseNormalizer) -> Self {
        Self { client, normalizer }
    }

    pub fn client(&self) -> &dyn ModelClient {
        self.client.as_ref()
    }

    /// Send `state.input_text` to the model and return a new state carrying
    /// the same prompt and the normalized answer.
    ///
    /// Blocks until the client returns. Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`CleaningError::ModelClient`] with the client's own error
    /// - [`CleaningError::UnrecognizedResponseShape`] if the response cannot
    ///   be normalized
    pub fn run(&self, state: &CleaningState) -> Result<CleaningState> {
        let response = self
            .client
            .invoke(&state.input_text)
            .map_err(CleaningError::ModelClient)?;

        let text = self.normalizer.normalize(&response)?;
        debug!(
            client = self.client.name(),
            response_chars = text.len(),
            "Model response normalized"
        );

        Ok(state.with_response(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ModelResponse, ScriptedModelClient};
    use serde_json::json;

    #[test]
    fn test_run_returns_content_and_keeps_prompt() {
        let client = ScriptedModelClient::new();
        client.push_message("hello");
        let agent = CleaningAgent::new(Arc::new(client.clone()));

        let state = CleaningState::new("clean this");
        let result = agent.run(&state).unwrap();

        assert_eq!(result.input_text, "clean this");
        assert_eq!(result.structured_response, "hello");
        assert_eq!(client.prompts(), vec!["clean this"]);
    }

    #[test]
    fn test_run_accepts_mapping_response() {
        let client = ScriptedModelClient::new();
        client.push_response(ModelResponse::from(json!({"content": "hello"})));
        let agent = CleaningAgent::new(Arc::new(client));

        let result = agent.run(&CleaningState::new("p")).unwrap();
        assert_eq!(result.structured_response, "hello");
    }

    #[test]
    fn test_run_rejects_unknown_shape() {
        let client = ScriptedModelClient::new();
        client.push_response(ModelResponse::from(json!({"output": "hello"})));
        let agent = CleaningAgent::new(Arc::new(client));

        let err = agent.run(&CleaningState::new("p")).unwrap_err();
        assert!(matches!(err, CleaningError::UnrecognizedResponseShape { .. }));
    }

    #[test]
    fn test_client_error_is_passed_through() {
        let client = ScriptedModelClient::new();
        client.push_error("401 Unauthorized");
        let agent = CleaningAgent::new(Arc::new(client.clone()));

        let err = agent.run(&CleaningState::new("p")).unwrap_err();
        match err {
            CleaningError::ModelClient(inner) => assert_eq!(inner.to_string(), "401 Unauthorized"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.call_count(), 1);
    }
}
