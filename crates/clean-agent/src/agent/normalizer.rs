//! Response normalization strategies.
//!
//! Model clients hand back differently shaped responses. A
//! [`ResponseNormalizer`] tries its [`ContentStrategy`] list in order and
//! takes the first one that recognizes the response.

use crate::ai::ModelResponse;
use crate::error::{CleaningError, Result};
use serde_json::Value;
use tracing::trace;

/// One way of reading text out of a model response.
pub trait ContentStrategy: Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &'static str;

    /// The response text, or `None` if this strategy does not apply.
    fn extract(&self, response: &ModelResponse) -> Option<String>;
}

/// Reads the `content` key of a mapping response.
pub struct MappingContent;

impl ContentStrategy for MappingContent {
    fn name(&self) -> &'static str {
        "mapping-content"
    }

    fn extract(&self, response: &ModelResponse) -> Option<String> {
        let ModelResponse::Mapping(map) = response else {
            return None;
        };
        map.get("content").map(|value| match value {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}

/// Reads the `content` field of a message object.
pub struct FieldContent;

impl ContentStrategy for FieldContent {
    fn name(&self) -> &'static str {
        "field-content"
    }

    fn extract(&self, response: &ModelResponse) -> Option<String> {
        match response {
            ModelResponse::Message(message) => Some(message.content.clone().unwrap_or_default()),
            _ => None,
        }
    }
}

/// Ordered list of content strategies.
pub struct ResponseNormalizer {
    strategies: Vec<Box<dyn ContentStrategy>>,
}

impl Default for ResponseNormalizer {
    /// Mapping `content` key first, then message `content` field.
    fn default() -> Self {
        Self::new(vec![Box::new(MappingContent), Box::new(FieldContent)])
    }
}

impl ResponseNormalizer {
    pub fn new(strategies: Vec<Box<dyn ContentStrategy>>) -> Self {
        Self { strategies }
    }

    /// Reduce a response to plain text.
    ///
    /// # Errors
    ///
    /// [`CleaningError::UnrecognizedResponseShape`] if no strategy applies.
    pub fn normalize(&self, response: &ModelResponse) -> Result<String> {
        for strategy in &self.strategies {
            if let Some(text) = strategy.extract(response) {
                trace!(strategy = strategy.name(), chars = text.len(), "Response normalized");
                return Ok(text);
            }
        }
        Err(CleaningError::UnrecognizedResponseShape {
            shape: response.shape(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AssistantMessage;
    use serde_json::json;

    #[test]
    fn test_mapping_with_content_key() {
        let response = ModelResponse::from(json!({"content": "hello", "role": "assistant"}));
        assert_eq!(ResponseNormalizer::default().normalize(&response).unwrap(), "hello");
    }

    #[test]
    fn test_message_with_content_field() {
        let response = ModelResponse::message("hello");
        assert_eq!(ResponseNormalizer::default().normalize(&response).unwrap(), "hello");
    }

    #[test]
    fn test_null_content_normalizes_to_empty() {
        let response = ModelResponse::Message(AssistantMessage {
            role: None,
            content: None,
        });
        assert_eq!(ResponseNormalizer::default().normalize(&response).unwrap(), "");

        let response = ModelResponse::from(json!({"content": null}));
        assert_eq!(ResponseNormalizer::default().normalize(&response).unwrap(), "");
    }

    #[test]
    fn test_non_string_mapping_content_is_rendered_as_json() {
        let response = ModelResponse::from(json!({"content": [{"a": 1}]}));
        assert_eq!(
            ResponseNormalizer::default().normalize(&response).unwrap(),
            r#"[{"a":1}]"#
        );
    }

    #[test]
    fn test_mapping_without_content_is_rejected() {
        let response = ModelResponse::from(json!({"text": "hello"}));
        let err = ResponseNormalizer::default().normalize(&response).unwrap_err();
        assert!(matches!(err, CleaningError::UnrecognizedResponseShape { .. }));
    }

    #[test]
    fn test_other_value_is_rejected() {
        let response = ModelResponse::from(json!(42));
        let err = ResponseNormalizer::default().normalize(&response).unwrap_err();
        assert_eq!(err.error_code(), "UNRECOGNIZED_RESPONSE_SHAPE");
    }

    #[test]
    fn test_strategy_order_is_respected() {
        let only_fields = ResponseNormalizer::new(vec![Box::new(FieldContent)]);
        let response = ModelResponse::from(json!({"content": "hello"}));
        assert!(only_fields.normalize(&response).is_err());
    }

    struct FixedText;

    impl ContentStrategy for FixedText {
        fn name(&self) -> &'static str {
            "fixed-text"
        }

        fn extract(&self, _response: &ModelResponse) -> Option<String> {
            Some("[]".to_string())
        }
    }

    #[test]
    fn test_custom_strategy_runs_before_defaults() {
        let normalizer = ResponseNormalizer::new(vec![Box::new(FixedText), Box::new(MappingContent)]);
        let response = ModelResponse::from(json!({"content": "hello"}));

        assert_eq!(normalizer.normalize(&response).unwrap(), "[]");
        assert_eq!(FixedText.name(), "fixed-text");
        assert_eq!(MappingContent.name(), "mapping-content");
        assert_eq!(FieldContent.name(), "field-content");
    }
}
