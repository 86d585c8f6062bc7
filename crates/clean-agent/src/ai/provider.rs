//! Model client trait for abstracting LLM interactions.
//!
//! This module defines the [`ModelClient`] trait that lets the orchestrator
//! talk to any text-generation backend (Groq, OpenRouter, a local server, a
//! scripted test double) without changing the batching logic.
//!
//! # Implementing a New Client
//!
//! 1. Create a new file in `src/ai/` (e.g., `ollama.rs`)
//! 2. Implement [`ModelClient`] for your client struct
//! 3. Export the client in `src/ai/mod.rs`
//!
//! # Example
//!
//! ```rust,ignore
//! use clean_agent::ai::{ModelClient, ModelResponse};
//!
//! struct Echo;
//!
//! impl ModelClient for Echo {
//!     fn invoke(&self, prompt: &str) -> anyhow::Result<ModelResponse> {
//!         Ok(ModelResponse::message(prompt))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Echo"
//!     }
//! }
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message object as returned by chat-completion style APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub role: Option<String>,
    /// The generated text. `None` when the API sent `null` (e.g., tool calls).
    #[serde(default)]
    pub content: Option<String>,
}

/// Raw response of a model client, before normalization.
///
/// Backends differ in what they hand back; the agent reduces every supported
/// shape to plain text and rejects the rest.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// A key/value mapping, expected to carry a `content` key.
    Mapping(Map<String, Value>),
    /// A message object with a `content` field.
    Message(AssistantMessage),
    /// Anything else the backend produced.
    Other(Value),
}

impl ModelResponse {
    /// Convenience constructor for an assistant message with text content.
    pub fn message(content: impl Into<String>) -> Self {
        ModelResponse::Message(AssistantMessage {
            role: Some("assistant".to_string()),
            content: Some(content.into()),
        })
    }

    /// Short description of the response shape, used in error messages.
    pub fn shape(&self) -> String {
        match self {
            ModelResponse::Mapping(map) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                format!("mapping with keys {:?}", keys)
            }
            ModelResponse::Message(_) => "message object".to_string(),
            ModelResponse::Other(value) => {
                format!("unsupported value ({})", crate::table::json_kind(value))
            }
        }
    }
}

impl From<Value> for ModelResponse {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ModelResponse::Mapping(map),
            other => ModelResponse::Other(other),
        }
    }
}

/// Trait for text-generation backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one client can serve several
/// requests. Calls block until the backend answers.
///
/// # Error Handling
///
/// Transport, auth, and rate-limit failures are returned as `anyhow` errors.
/// The orchestrator does not retry them; retries, if wanted, belong inside
/// the client.
pub trait ModelClient: Send + Sync {
    /// Send a prompt and return the backend's raw response.
    fn invoke(&self, prompt: &str) -> Result<ModelResponse>;

    /// Get the client name for logging and debugging.
    fn name(&self) -> &str;

    /// Get the model being used by this client.
    ///
    /// Returns `None` if the client doesn't expose model information.
    fn model(&self) -> Option<&str> {
        None
    }
}
