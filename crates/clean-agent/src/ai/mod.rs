//! Model clients.
//!
//! The orchestrator only sees the [`ModelClient`] trait. Concrete backends:
//!
//! - [`ChatClient`] - OpenAI-compatible chat completions, preconfigured for
//!   Groq and OpenRouter (requires `ai` feature)
//! - [`ScriptedModelClient`] - in-memory replay client for tests and dry runs
//!
//! # Feature Flag
//!
//! ```toml
//! # Enable HTTP-backed clients (default)
//! clean_agent = { version = "0.1", features = ["ai"] }
//!
//! # Core only: bring your own ModelClient
//! clean_agent = { version = "0.1", default-features = false }
//! ```

// Client trait is always available (for custom implementations)
mod provider;
mod scripted;

pub use provider::{AssistantMessage, ModelClient, ModelResponse};
pub use scripted::ScriptedModelClient;

// HTTP-backed clients require the "ai" feature
#[cfg(feature = "ai")]
mod chat;

#[cfg(feature = "ai")]
pub use chat::{ChatClient, ChatConfig, ChatConfigBuilder, Provider};
