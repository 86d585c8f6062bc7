//! Chat-completions model client.
//!
//! This module provides [`ChatClient`], a blocking [`ModelClient`] for
//! OpenAI-compatible chat-completion endpoints. Two hosted providers are
//! preconfigured through [`Provider`]: Groq (<https://groq.com/>) and
//! OpenRouter (<https://openrouter.ai/>).

use super::{AssistantMessage, ModelClient, ModelResponse};
use crate::error::CleaningError;
use anyhow::{anyhow, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default timeout for API requests in seconds.
///
/// Cleaning a batch means echoing it back, so answers are long.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default temperature for model responses (low for deterministic outputs).
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Default max tokens for responses.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Hosted chat-completion providers with known defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Provider {
    #[default]
    Groq,
    OpenRouter,
}

impl Provider {
    /// Chat-completions endpoint.
    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1/chat/completions",
            Provider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Groq => "deepseek-r1-distill-llama-70b",
            Provider::OpenRouter => "deepseek/deepseek-chat",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Groq => "Groq",
            Provider::OpenRouter => "OpenRouter",
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Configuration for the chat client.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub provider: Provider,
    /// The model to use (e.g., "deepseek-r1-distill-llama-70b", "openai/gpt-4o").
    pub model: String,
    /// Temperature for response generation (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Endpoint URL (useful for proxies or self-hosted compatible servers).
    pub base_url: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::for_provider(Provider::default())
    }
}

impl ChatConfig {
    /// Defaults for a given provider.
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: provider.base_url().to_string(),
        }
    }

    /// Create a new configuration builder.
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::default()
    }
}

/// Builder for [`ChatConfig`].
#[derive(Default)]
pub struct ChatConfigBuilder {
    provider: Option<Provider>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl ChatConfigBuilder {
    /// Set the provider; its defaults fill any unset field.
    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the model to use.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature (0.0 - 2.0).
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Set a custom base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ChatConfig {
        let defaults = ChatConfig::for_provider(self.provider.unwrap_or_default());
        ChatConfig {
            provider: defaults.provider,
            model: self.model.unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            base_url: self.base_url.unwrap_or(defaults.base_url),
        }
    }
}

/// Blocking client for OpenAI-compatible chat-completion APIs.
///
/// # Example
///
/// ```rust,ignore
/// use clean_agent::ai::{ChatClient, ChatConfig, Provider};
///
/// // Key read from GROQ_API_KEY
/// let client = ChatClient::from_env(ChatConfig::default())?;
///
/// // Explicit key and provider
/// let config = ChatConfig::builder()
///     .provider(Provider::OpenRouter)
///     .model("openai/gpt-4o-mini")
///     .build();
/// let client = ChatClient::new("your-api-key", config)?;
/// ```
pub struct ChatClient {
    api_key: String,
    config: ChatConfig,
    client: Client,
}

impl ChatClient {
    /// Create a client with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>, config: ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    /// Create a client reading the key from the provider's environment variable.
    pub fn from_env(config: ChatConfig) -> crate::error::Result<Self> {
        let var = config.provider.api_key_var();
        let api_key = std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CleaningError::InvalidConfiguration(format!("{} is not set", var)))?;

        Self::new(api_key, config).map_err(CleaningError::ModelClient)
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn call_api(&self, prompt: &str) -> Result<Value> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "clean-agent")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "{} API Error {}: {}",
                self.config.provider.display_name(),
                response.status(),
                response.text()?
            ));
        }

        Ok(response.json()?)
    }
}

/// Pull the first choice's message out of a chat-completion body.
///
/// Bodies without one are handed back whole so the agent reports the shape.
fn response_from_body(body: Value) -> ModelResponse {
    let message = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .filter(|message| message.is_object())
        .cloned()
        .and_then(|message| serde_json::from_value::<AssistantMessage>(message).ok());

    match message {
        Some(message) => ModelResponse::Message(message),
        None => ModelResponse::Other(body),
    }
}

impl ModelClient for ChatClient {
    fn invoke(&self, prompt: &str) -> Result<ModelResponse> {
        debug!(
            provider = self.config.provider.display_name(),
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Calling chat completions"
        );
        let body = self.call_api(prompt)?;
        Ok(response_from_body(body))
    }

    fn name(&self) -> &str {
        self.config.provider.display_name()
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -------------------------------------------------------------------------
    // Response body handling
    // -------------------------------------------------------------------------

    #[test]
    fn test_body_with_message_becomes_message() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "[{\"a\": 1}]"
                }
            }]
        });

        match response_from_body(body) {
            ModelResponse::Message(message) => {
                assert_eq!(message.content.as_deref(), Some("[{\"a\": 1}]"));
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_body_with_null_content_is_still_a_message() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": null}}]});
        assert!(matches!(
            response_from_body(body),
            ModelResponse::Message(AssistantMessage { content: None, .. })
        ));
    }

    #[test]
    fn test_body_with_empty_choices_is_other() {
        let body = json!({"choices": []});
        assert!(matches!(response_from_body(body), ModelResponse::Other(_)));
    }

    #[test]
    fn test_body_with_string_message_is_other() {
        let body = json!({"choices": [{"message": "not an object"}]});
        assert!(matches!(response_from_body(body), ModelResponse::Other(_)));
    }

    // -------------------------------------------------------------------------
    // Config builder tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_config_builder_defaults() {
        let config = ChatConfig::builder().build();

        assert_eq!(config.provider, Provider::Groq);
        assert_eq!(config.model, "deepseek-r1-distill-llama-70b");
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.base_url, Provider::Groq.base_url());
    }

    #[test]
    fn test_config_builder_provider_defaults() {
        let config = ChatConfig::builder().provider(Provider::OpenRouter).build();
        assert_eq!(config.model, "deepseek/deepseek-chat");
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn test_config_builder_custom_values() {
        let config = ChatConfig::builder()
            .provider(Provider::OpenRouter)
            .model("openai/gpt-4o")
            .temperature(0.5)
            .max_tokens(200)
            .timeout_secs(60)
            .base_url("https://custom.api.com")
            .build();

        assert_eq!(config.model, "openai/gpt-4o");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_tokens, 200);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.base_url, "https://custom.api.com");
    }

    // -------------------------------------------------------------------------
    // Client trait implementation tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_client_name_and_model() {
        let client = ChatClient::new("test-key", ChatConfig::default()).unwrap();
        assert_eq!(client.name(), "Groq");
        assert_eq!(client.model(), Some("deepseek-r1-distill-llama-70b"));

        let config = ChatConfig::builder()
            .provider(Provider::OpenRouter)
            .model("custom-model")
            .build();
        let client = ChatClient::new("test-key", config).unwrap();
        assert_eq!(client.name(), "OpenRouter");
        assert_eq!(client.model(), Some("custom-model"));
    }
}
