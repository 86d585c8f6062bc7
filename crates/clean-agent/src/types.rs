//! Core data types shared by the agent, orchestrator, and extractor.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured record: field name to scalar.
pub type Record = serde_json::Map<String, Value>;

/// Prompt/response pair threaded through one agent run.
///
/// Built fresh for every batch and dropped once the response is collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningState {
    /// The prompt sent to the model. Never modified by the agent.
    pub input_text: String,
    /// The normalized model answer; empty until the agent has run.
    pub structured_response: String,
}

impl CleaningState {
    /// A state ready to be sent to the model.
    pub fn new(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            structured_response: String::new(),
        }
    }

    /// The same prompt paired with a model answer.
    pub fn with_response(&self, structured_response: impl Into<String>) -> Self {
        Self {
            input_text: self.input_text.clone(),
            structured_response: structured_response.into(),
        }
    }
}

/// Row range `[start, end)` covered by one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSpan {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl BatchSpan {
    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Ordered per-batch model responses for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedResult {
    responses: Vec<String>,
}

impl CombinedResult {
    pub fn new(responses: Vec<String>) -> Self {
        Self { responses }
    }

    /// Per-batch responses in batch order.
    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    /// Number of batches that produced a response.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// All responses joined by a single newline, in batch order.
    pub fn combined_text(&self) -> String {
        self.responses.join("\n")
    }

    pub fn into_responses(self) -> Vec<String> {
        self.responses
    }
}

/// Statistics about one cleaning request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub rows_before: usize,
    pub columns_before: usize,
    pub rows_after_rules: usize,
    pub batches: usize,
    pub records_recovered: usize,
    pub duration_ms: u64,
}

/// Everything produced by one end-to-end cleaning request.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// Table after the rule-based pass (identical to the input when disabled).
    pub rule_cleaned: DataFrame,
    /// Raw per-batch model responses.
    pub combined: CombinedResult,
    /// Records recovered from the model output, in batch order.
    pub records: Vec<Value>,
    /// The recovered records as a table.
    pub table: DataFrame,
    pub summary: CleaningSummary,
}
