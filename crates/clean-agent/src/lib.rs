//! AI-assisted batch cleaning
//!
//! Cleans tabular data in two passes: deterministic rules first, then a
//! large language model that works through the table in fixed-size row
//! batches. The model's free-text answers are reconciled back into records.
//!
//! # Overview
//!
//! - **Batch orchestration**: slice a table into batches, render one prompt per
//!   batch, call the model once per batch, join the answers in batch order
//! - **Response normalization**: reduce differently shaped client responses
//!   to plain text through an ordered list of strategies
//! - **Record recovery**: pull JSON arrays out of prose, one per batch
//! - **Rule-based cleaning**: duplicate removal and mean/mode imputation
//! - **Table sources**: CSV, JSON and spreadsheet files, SQLite queries, JSON
//!   over HTTP
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use clean_agent::ai::{ChatClient, ChatConfig, Provider};
//! use clean_agent::sources::{CsvSource, TableSource};
//! use clean_agent::{CleaningConfig, Pipeline};
//! use std::sync::Arc;
//!
//! let df = CsvSource::new("people.csv").load()?;
//! let client = Arc::new(ChatClient::from_env(ChatConfig::for_provider(Provider::Groq))?);
//!
//! let outcome = Pipeline::builder()
//!     .config(CleaningConfig::builder().batch_size(20).build()?)
//!     .model_client(client)
//!     .build()?
//!     .run(&df)?;
//!
//! println!("{} records recovered", outcome.records.len());
//! ```
//!
//! # Lower-level pieces
//!
//! The orchestrator and extractors can be used on their own:
//!
//! ```rust,ignore
//! use clean_agent::agent::CleaningAgent;
//! use clean_agent::extract::extract;
//! use clean_agent::orchestrator::{BatchOrchestrator, PromptTemplate};
//!
//! let orchestrator = BatchOrchestrator::new(CleaningAgent::new(client), PromptTemplate::default());
//! let combined = orchestrator.process(&df, 20)?;
//! let records = extract(&combined)?; // single-batch output only
//! ```
//!
//! # Errors
//!
//! Every fallible operation returns [`CleaningError`]. Errors raised inside a
//! batch are wrapped in [`CleaningError::BatchFailed`]; use
//! [`CleaningError::root`] and [`CleaningError::error_code`] to look through it.

pub mod agent;
pub mod ai;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod pipeline;
pub mod sources;
pub mod table;
pub mod types;
pub mod utils;

pub use agent::{CleaningAgent, ContentStrategy, ResponseNormalizer};
pub use ai::{ModelClient, ModelResponse, ScriptedModelClient};
pub use cleaner::{DataCleaner, PassthroughCleaner, RuleBasedCleaner};
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ConfigValidationError, ExtractionMode,
    DEFAULT_BATCH_SIZE,
};
pub use error::{CleaningError, Result};
pub use extract::{extract, extract_batches, extract_batches_with_tables, scan_arrays};
pub use orchestrator::{
    BatchOrchestrator, BatchProgress, BatchStage, ClosureProgressReporter, ProgressReporter,
    PromptTemplate,
};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use sources::{source_for_path, TableSource};
pub use table::{records_to_table, render_table, table_from_json, table_to_records};
pub use types::{BatchSpan, CleaningOutcome, CleaningState, CleaningSummary, CombinedResult, Record};
