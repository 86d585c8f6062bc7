//! Per-batch progress reporting.
//!
//! Reporting is observational only: a reporter cannot pause or cancel the
//! batch loop.
//!
//! # Example
//!
//! ```rust,ignore
//! use clean_agent::orchestrator::BatchOrchestrator;
//!
//! let orchestrator = BatchOrchestrator::new(agent, template)
//!     .on_progress(|update| {
//!         println!("[{}/{}] {}", update.batch_index + 1, update.batch_count, update.message);
//!     });
//! ```

use crate::types::BatchSpan;
use serde::{Deserialize, Serialize};

/// Lifecycle of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    /// Prompt rendered, model call about to start
    Started,
    /// Model answered and the answer was normalized
    Completed,
    /// The batch failed; the request is aborted
    Failed,
}

impl BatchStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

/// A progress update emitted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    pub stage: BatchStage,
    /// Zero-based batch index.
    pub batch_index: usize,
    pub batch_count: usize,
    /// Row range `[start, end)` of the batch.
    pub rows: (usize, usize),
    pub message: String,
}

impl BatchProgress {
    pub fn new(stage: BatchStage, span: &BatchSpan, batch_count: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            batch_index: span.index,
            batch_count,
            rows: (span.start, span.end),
            message: message.into(),
        }
    }

    /// Fraction of batches finished once this update is applied (0.0 - 1.0).
    pub fn fraction_done(&self) -> f32 {
        if self.batch_count == 0 {
            return 1.0;
        }
        let done = match self.stage {
            BatchStage::Completed => self.batch_index + 1,
            BatchStage::Started | BatchStage::Failed => self.batch_index,
        };
        done as f32 / self.batch_count as f32
    }
}

/// Trait for receiving progress updates.
///
/// Implementations must be `Send + Sync` since orchestrators are shared
/// across threads.
pub trait ProgressReporter: Send + Sync {
    /// Called for every batch stage change.
    fn report(&self, update: BatchProgress);
}

/// A progress reporter that wraps a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(BatchProgress) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(BatchProgress) + Send + Sync,
{
    /// Create a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(BatchProgress) + Send + Sync,
{
    fn report(&self, update: BatchProgress) {
        (self.callback)(update);
    }
}
