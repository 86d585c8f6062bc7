//! Configuration types for the cleaning orchestrator.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic setup.

use crate::error::CleaningError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of rows sent to the model per batch.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Placeholder replaced by the rendered batch table.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Default cleaning instruction sent with every batch.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are an AI Data Cleaning Agent. Analyze the dataset:

{table}

- Identify missing values and impute them (mean for numeric columns, mode for categorical columns, median for skewed numeric columns)
- Remove duplicate rows
- Format text values correctly (e.g., title case for names)
- Normalize numeric values to a consistent scale (if applicable)
- Return the cleaned data in a structured format (table format or JSON array of records).
";

/// How structured records are recovered from the combined model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExtractionMode {
    /// Slice from the first `[` to the last `]` of the combined text.
    /// Only reliable when the table fits in a single batch.
    FirstToLast,
    /// Scan each batch response for balanced JSON arrays.
    #[default]
    PerBatch,
    /// As `PerBatch`, but a response without a JSON array is read as a CSV
    /// table before it is rejected.
    PerBatchWithTableFallback,
}

/// Configuration for the cleaning pipeline.
///
/// Use [`CleaningConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use clean_agent::config::{CleaningConfig, ExtractionMode};
///
/// let config = CleaningConfig::builder()
///     .batch_size(50)
///     .extraction_mode(ExtractionMode::PerBatch)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Maximum number of rows per model invocation.
    /// Default: 20
    pub batch_size: usize,

    /// Instruction template; must contain `{table}`.
    /// `{batch_index}` and `{batch_count}` are substituted when present.
    pub prompt_template: String,

    /// Whether to run the rule-based cleaner before the model.
    /// Default: true
    pub rule_based_cleaning: bool,

    /// How records are recovered from the model output.
    /// Default: PerBatch
    pub extraction_mode: ExtractionMode,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            rule_based_cleaning: true,
            extraction_mode: ExtractionMode::default(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CleaningConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        validate_batch_size(self.batch_size)?;

        if !self.prompt_template.contains(TABLE_PLACEHOLDER) {
            return Err(ConfigValidationError::MissingTablePlaceholder);
        }

        Ok(())
    }
}

/// Check a batch size before any work is scheduled.
pub fn validate_batch_size(batch_size: usize) -> Result<(), ConfigValidationError> {
    if batch_size == 0 {
        return Err(ConfigValidationError::InvalidBatchSize(0));
    }
    Ok(())
}

/// Convert a signed batch size (as typed on a command line) into a valid one.
pub fn batch_size_from_signed(batch_size: i64) -> Result<usize, ConfigValidationError> {
    match usize::try_from(batch_size) {
        Ok(size) if size >= 1 => Ok(size),
        _ => Err(ConfigValidationError::InvalidBatchSize(batch_size)),
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid batch size: {0} (must be at least 1)")]
    InvalidBatchSize(i64),

    #[error("Prompt template must contain the {{table}} placeholder")]
    MissingTablePlaceholder,
}

impl From<ConfigValidationError> for CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        CleaningError::InvalidConfiguration(err.to_string())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    batch_size: Option<usize>,
    prompt_template: Option<String>,
    rule_based_cleaning: Option<bool>,
    extraction_mode: Option<ExtractionMode>,
}

impl CleaningConfigBuilder {
    /// Set the number of rows per batch.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set a custom prompt template.
    ///
    /// The template must contain `{table}`; the rendered batch is inserted there.
    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    /// Enable or disable the rule-based cleaning pass.
    pub fn rule_based_cleaning(mut self, enable: bool) -> Self {
        self.rule_based_cleaning = Some(enable);
        self
    }

    /// Set how records are recovered from the model output.
    pub fn extraction_mode(mut self, mode: ExtractionMode) -> Self {
        self.extraction_mode = Some(mode);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            prompt_template: self
                .prompt_template
                .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()),
            rule_based_cleaning: self.rule_based_cleaning.unwrap_or(true),
            extraction_mode: self.extraction_mode.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
