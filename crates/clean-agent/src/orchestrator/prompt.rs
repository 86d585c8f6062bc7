//! Prompt rendering for one batch.

use crate::config::{validate_batch_size, DEFAULT_PROMPT_TEMPLATE, TABLE_PLACEHOLDER};
use crate::error::{CleaningError, Result};
use crate::table::render_table;
use crate::types::BatchSpan;
use polars::prelude::DataFrame;

/// A cleaning instruction with a `{table}` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// [`CleaningError::InvalidConfiguration`] if `{table}` is missing.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(TABLE_PLACEHOLDER) {
            return Err(CleaningError::InvalidConfiguration(
                "prompt template must contain the {table} placeholder".to_string(),
            ));
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Render the prompt for one batch.
    ///
    /// `batch` must already be sliced to `span`.
    pub fn render(&self, batch: &DataFrame, span: &BatchSpan, batch_count: usize) -> String {
        // {table} last, so braces inside cell values are never re-substituted
        self.template
            .replace("{batch_index}", &(span.index + 1).to_string())
            .replace("{batch_count}", &batch_count.to_string())
            .replace(TABLE_PLACEHOLDER, render_table(batch, span.start).trim_end())
    }
}

/// Render every prompt that [`BatchOrchestrator::process`] would send,
/// without calling a model.
///
/// [`BatchOrchestrator::process`]: super::BatchOrchestrator::process
pub fn render_prompts(
    template: &PromptTemplate,
    table: &DataFrame,
    batch_size: usize,
) -> Result<Vec<(BatchSpan, String)>> {
    validate_batch_size(batch_size)?;
    let spans = crate::table::batch_spans(table.height(), batch_size);
    let count = spans.len();
    Ok(spans
        .into_iter()
        .map(|span| {
            let batch = crate::table::slice_batch(table, &span);
            let prompt = template.render(&batch, &span, count);
            (span, prompt)
        })
        .collect())
}
