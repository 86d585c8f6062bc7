//! Error types for the cleaning orchestrator.
//!
//! [`CleaningError`] is the single error type surfaced by the core. Errors
//! raised by collaborators (model clients, table sources, rule-based cleaners)
//! travel as `anyhow::Error` and are wrapped without being re-interpreted.
//!
//! Errors are serializable as `{ code, message }` so a service layer can hand
//! them to a frontend unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning orchestrator.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Caller misuse detected before any model call (bad batch size, bad template).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The model client returned a response the agent cannot normalize.
    #[error("Unrecognized model response shape: {shape}")]
    UnrecognizedResponseShape { shape: String },

    /// Error raised by the model client itself (transport, auth, rate limits).
    #[error("Model client error: {0}")]
    ModelClient(#[source] anyhow::Error),

    /// The model's text could not be reduced to a structured array.
    #[error("Malformed model output{}: {reason}", batch_suffix(.batch))]
    MalformedModelOutput {
        batch: Option<usize>,
        reason: String,
        raw: String,
    },

    /// An extracted array element is not a record (JSON object).
    #[error("Element {index} of the extracted array is {found}, expected an object")]
    UnexpectedRecordShape { index: usize, found: &'static str },

    /// A batch failed; `source` is the underlying error, untouched.
    #[error("Batch {index} failed: {source}")]
    BatchFailed {
        index: usize,
        #[source]
        source: Box<CleaningError>,
    },

    /// A table source could not produce a table.
    #[error("Failed to load table: {0}")]
    SourceFailed(String),

    /// The rule-based cleaner failed.
    #[error("Rule-based cleaning failed: {0}")]
    RuleCleaningFailed(#[source] anyhow::Error),

    /// Internal error (e.g., blocking task join failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (only with "ai" feature).
    #[cfg(feature = "ai")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),
}

fn batch_suffix(batch: &Option<usize>) -> String {
    match batch {
        Some(index) => format!(" in batch {index}"),
        None => String::new(),
    }
}

impl CleaningError {
    /// Annotate an error with the index of the batch that raised it.
    pub fn in_batch(self, index: usize) -> Self {
        CleaningError::BatchFailed {
            index,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through batch annotations.
    pub fn root(&self) -> &CleaningError {
        match self {
            Self::BatchFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Index of the failing batch, if the error was raised inside one.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            Self::BatchFailed { index, .. } => Some(*index),
            Self::MalformedModelOutput { batch, .. } => *batch,
            _ => None,
        }
    }

    /// Raw model text carried for diagnostics, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self.root() {
            Self::MalformedModelOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            Self::UnrecognizedResponseShape { .. } => "UNRECOGNIZED_RESPONSE_SHAPE",
            Self::ModelClient(_) => "MODEL_CLIENT_ERROR",
            Self::MalformedModelOutput { .. } => "MALFORMED_MODEL_OUTPUT",
            Self::UnexpectedRecordShape { .. } => "UNEXPECTED_RECORD_SHAPE",
            Self::BatchFailed { source, .. } => source.error_code(),
            Self::SourceFailed(_) => "SOURCE_FAILED",
            Self::RuleCleaningFailed(_) => "RULE_CLEANING_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "ai")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
        }
    }

    /// Whether a caller may reasonably retry the whole request.
    ///
    /// The core never retries. Only model client failures (network, rate
    /// limits) are hinted as retriable; shape and parse failures are not.
    pub fn is_retriable(&self) -> bool {
        matches!(self.root(), Self::ModelClient(_))
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;
