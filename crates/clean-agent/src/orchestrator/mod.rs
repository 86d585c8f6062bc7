//! Batch orchestrator.
//!
//! Splits a table into fixed-size row batches, renders one cleaning prompt per
//! batch, runs the [`CleaningAgent`] on each in order, and joins the answers.
//!
//! Batches run strictly one after another on the calling thread. The first
//! failing batch aborts the request; answers collected before it are dropped.

mod progress;
mod prompt;

pub use progress::{BatchProgress, BatchStage, ClosureProgressReporter, ProgressReporter};
pub use prompt::{render_prompts, PromptTemplate};

use crate::agent::CleaningAgent;
use crate::config::validate_batch_size;
use crate::error::Result;
use crate::table::{batch_spans, slice_batch};
use crate::types::{CleaningState, CombinedResult};
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::{debug, info};

/// Drives the cleaning agent over a table, one batch at a time.
///
/// Holds no per-request state, so one instance can serve concurrent
/// requests as long as its model client can.
///
/// # Example
///
/// ```rust,ignore
/// use clean_agent::agent::CleaningAgent;
/// use clean_agent::ai::{ChatClient, ChatConfig};
/// use clean_agent::orchestrator::{BatchOrchestrator, PromptTemplate};
/// use std::sync::Arc;
///
/// let client = Arc::new(ChatClient::from_env(ChatConfig::default())?);
/// let orchestrator = BatchOrchestrator::new(CleaningAgent::new(client), PromptTemplate::default());
/// let text = orchestrator.process(&df, 20)?;
/// ```
pub struct BatchOrchestrator {
    agent: CleaningAgent,
    template: PromptTemplate,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(BatchOrchestrator: Send, Sync);

impl BatchOrchestrator {
    pub fn new(agent: CleaningAgent, template: PromptTemplate) -> Self {
        Self {
            agent,
            template,
            progress_reporter: None,
        }
    }

    /// Attach a progress reporter.
    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Attach a progress callback.
    pub fn on_progress<F>(self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.with_progress_reporter(Arc::new(ClosureProgressReporter::new(callback)))
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Clean `table` in batches of `batch_size` rows and return every batch's
    /// answer joined by `\n`, in batch order.
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` if `batch_size` is 0, before any model call
    /// - the first batch failure, wrapped as `BatchFailed { index, .. }`
    pub fn process(&self, table: &DataFrame, batch_size: usize) -> Result<String> {
        Ok(self.process_batches(table, batch_size)?.combined_text())
    }

    /// Like [`process`](Self::process), but keeps the answers separate.
    pub fn process_batches(&self, table: &DataFrame, batch_size: usize) -> Result<CombinedResult> {
        validate_batch_size(batch_size)?;

        let spans = batch_spans(table.height(), batch_size);
        let batch_count = spans.len();
        info!(
            rows = table.height(),
            batch_size,
            batches = batch_count,
            client = self.agent.client().name(),
            "Starting AI cleaning"
        );

        let mut responses = Vec::with_capacity(batch_count);
        for span in &spans {
            let batch = slice_batch(table, span);
            let prompt = self.template.render(&batch, span, batch_count);

            self.report(BatchProgress::new(
                BatchStage::Started,
                span,
                batch_count,
                format!("Cleaning rows {}..{}", span.start, span.end),
            ));
            debug!(
                batch = span.index,
                start = span.start,
                end = span.end,
                "Sending batch to model"
            );

            let state = CleaningState::new(prompt);
            let result = match self.agent.run(&state) {
                Ok(result) => result,
                Err(e) => {
                    self.report(BatchProgress::new(
                        BatchStage::Failed,
                        span,
                        batch_count,
                        e.to_string(),
                    ));
                    return Err(e.in_batch(span.index));
                }
            };

            debug!(
                batch = span.index,
                response_chars = result.structured_response.len(),
                "Batch answered"
            );
            self.report(BatchProgress::new(
                BatchStage::Completed,
                span,
                batch_count,
                format!("Rows {}..{} cleaned", span.start, span.end),
            ));
            responses.push(result.structured_response);
        }

        Ok(CombinedResult::new(responses))
    }

    fn report(&self, update: BatchProgress) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}
