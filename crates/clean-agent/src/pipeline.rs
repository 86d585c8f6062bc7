//! End-to-end cleaning pipeline.
//!
//! Rule-based pass, then the batch orchestrator, then record recovery:
//!
//! ```text
//! DataFrame -> RuleBasedCleaner -> BatchOrchestrator -> extractor -> records -> DataFrame
//! ```

use crate::agent::CleaningAgent;
use crate::ai::ModelClient;
use crate::cleaner::{DataCleaner, RuleBasedCleaner};
use crate::config::{CleaningConfig, ExtractionMode};
use crate::error::{CleaningError, Result};
use crate::extract::{extract, extract_batches, extract_batches_with_tables};
use crate::orchestrator::{
    BatchOrchestrator, BatchProgress, ClosureProgressReporter, ProgressReporter, PromptTemplate,
};
use crate::table::records_to_table;
use crate::types::{CleaningOutcome, CleaningSummary, CombinedResult};
use polars::prelude::DataFrame;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use clean_agent::ai::{ChatClient, ChatConfig};
/// use clean_agent::{CleaningConfig, Pipeline};
/// use std::sync::Arc;
///
/// let client = Arc::new(ChatClient::from_env(ChatConfig::default())?);
/// let outcome = Pipeline::builder()
///     .config(CleaningConfig::builder().batch_size(50).build()?)
///     .model_client(client)
///     .on_progress(|update| println!("batch {}: {}", update.batch_index, update.message))
///     .build()?
///     .run(&df)?;
///
/// println!("{}", outcome.table);
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    cleaner: Arc<dyn RuleBasedCleaner>,
    orchestrator: BatchOrchestrator,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean `df` end to end.
    ///
    /// The input is never modified. On error nothing is returned for any
    /// batch, including batches that had already answered.
    pub fn run(&self, df: &DataFrame) -> Result<CleaningOutcome> {
        let start = Instant::now();
        match self.run_internal(df, start) {
            Ok(outcome) => {
                info!(
                    batches = outcome.summary.batches,
                    records = outcome.summary.records_recovered,
                    duration_ms = outcome.summary.duration_ms,
                    "Cleaning complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(code = e.error_code(), "Cleaning failed: {}", e);
                Err(e)
            }
        }
    }

    /// [`run`](Self::run) on a blocking worker thread, for async callers.
    #[cfg(feature = "ai")]
    pub async fn run_async(self: Arc<Self>, df: DataFrame) -> Result<CleaningOutcome> {
        tokio::task::spawn_blocking(move || self.run(&df))
            .await
            .map_err(|e| CleaningError::Internal(format!("cleaning task failed: {}", e)))?
    }

    fn run_internal(&self, df: &DataFrame, start: Instant) -> Result<CleaningOutcome> {
        info!(
            rows = df.height(),
            columns = df.width(),
            rules = self.config.rule_based_cleaning,
            "Starting cleaning request"
        );

        let rule_cleaned = if self.config.rule_based_cleaning {
            debug!(cleaner = self.cleaner.name(), "Running rule-based cleaner");
            self.cleaner
                .clean(df)
                .map_err(CleaningError::RuleCleaningFailed)?
        } else {
            df.clone()
        };

        let combined = self
            .orchestrator
            .process_batches(&rule_cleaned, self.config.batch_size)?;
        let records = self.recover_records(&combined)?;
        let table = records_to_table(&records)?;

        let summary = CleaningSummary {
            rows_before: df.height(),
            columns_before: df.width(),
            rows_after_rules: rule_cleaned.height(),
            batches: combined.len(),
            records_recovered: records.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        Ok(CleaningOutcome {
            rule_cleaned,
            combined,
            records,
            table,
            summary,
        })
    }

    fn recover_records(&self, combined: &CombinedResult) -> Result<Vec<Value>> {
        if combined.is_empty() {
            return Ok(Vec::new());
        }
        match self.config.extraction_mode {
            ExtractionMode::PerBatch => Ok(extract_batches(combined)?.into_iter().flatten().collect()),
            ExtractionMode::PerBatchWithTableFallback => Ok(extract_batches_with_tables(combined)?
                .into_iter()
                .flatten()
                .collect()),
            ExtractionMode::FirstToLast => extract(&combined.combined_text()),
        }
    }
}

/// Builder for creating a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    model_client: Option<Arc<dyn ModelClient>>,
    cleaner: Option<Arc<dyn RuleBasedCleaner>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the model client. Required.
    pub fn model_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.model_client = Some(client);
        self
    }

    /// Replace the default [`DataCleaner`].
    pub fn cleaner(mut self, cleaner: Arc<dyn RuleBasedCleaner>) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.progress_reporter(Arc::new(ClosureProgressReporter::new(callback)))
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// [`CleaningError::InvalidConfiguration`] if no model client was set or
    /// the configuration does not validate.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let client = self.model_client.ok_or_else(|| {
            CleaningError::InvalidConfiguration("a model client is required".to_string())
        })?;
        let template = PromptTemplate::new(config.prompt_template.clone())?;

        let mut orchestrator = BatchOrchestrator::new(CleaningAgent::new(client), template);
        if let Some(reporter) = self.progress_reporter {
            orchestrator = orchestrator.with_progress_reporter(reporter);
        }

        Ok(Pipeline {
            config,
            cleaner: self.cleaner.unwrap_or_else(|| Arc::new(DataCleaner)),
            orchestrator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedModelClient;
    use crate::cleaner::PassthroughCleaner;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pipeline(client: &ScriptedModelClient, config: CleaningConfig) -> Pipeline {
        Pipeline::builder()
            .config(config)
            .model_client(Arc::new(client.clone()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_model_client() {
        let err = Pipeline::builder().build().err().unwrap();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = CleaningConfig {
            batch_size: 0,
            ..CleaningConfig::default()
        };
        let err = Pipeline::builder()
            .config(config)
            .model_client(Arc::new(ScriptedModelClient::new()))
            .build()
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_per_batch_extraction_recovers_every_batch() {
        let client = ScriptedModelClient::new();
        client
            .push_message("[{\"name\":\"Alice\",\"age\":30}]")
            .push_message("Done.\n[{\"name\":\"Bob\",\"age\":41}]");
        let config = CleaningConfig::builder().batch_size(1).build().unwrap();

        let df = df!("name" => &["alice", "bob"], "age" => &[30i64, 41]).unwrap();
        let outcome = pipeline(&client, config).run(&df).unwrap();

        assert_eq!(
            outcome.records,
            vec![json!({"name": "Alice", "age": 30}), json!({"name": "Bob", "age": 41})]
        );
        assert_eq!(outcome.table.shape(), (2, 2));
        assert_eq!(outcome.summary.batches, 2);
        assert_eq!(outcome.summary.records_recovered, 2);
    }

    #[test]
    fn test_first_to_last_fails_on_multi_batch_output() {
        let client = ScriptedModelClient::new();
        client.push_message("[{\"a\":1}]").push_message("[{\"b\":2}]");
        let config = CleaningConfig::builder()
            .batch_size(1)
            .extraction_mode(ExtractionMode::FirstToLast)
            .build()
            .unwrap();

        let df = df!("v" => &[1i64, 2]).unwrap();
        let err = pipeline(&client, config).run(&df).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_MODEL_OUTPUT");
        assert_eq!(err.raw_output(), Some("[{\"a\":1}]\n[{\"b\":2}]"));
    }

    #[test]
    fn test_rules_run_before_model() {
        let client = ScriptedModelClient::new();
        client.push_message("[]");
        let df = df!("v" => &[1i64, 1, 2]).unwrap();

        let outcome = pipeline(&client, CleaningConfig::default()).run(&df).unwrap();
        assert_eq!(outcome.summary.rows_before, 3);
        assert_eq!(outcome.summary.rows_after_rules, 2);
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn test_rules_can_be_disabled_or_replaced() {
        let df = df!("v" => &[1i64, 1]).unwrap();

        let client = ScriptedModelClient::new();
        client.push_message("[]");
        let config = CleaningConfig::builder().rule_based_cleaning(false).build().unwrap();
        let outcome = pipeline(&client, config).run(&df).unwrap();
        assert_eq!(outcome.summary.rows_after_rules, 2);

        let client = ScriptedModelClient::new();
        client.push_message("[]");
        let outcome = Pipeline::builder()
            .model_client(Arc::new(client))
            .cleaner(Arc::new(PassthroughCleaner))
            .build()
            .unwrap()
            .run(&df)
            .unwrap();
        assert_eq!(outcome.rule_cleaned.height(), 2);
    }

    #[test]
    fn test_empty_table_needs_no_model() {
        let client = ScriptedModelClient::new();
        let config = CleaningConfig::builder()
            .extraction_mode(ExtractionMode::FirstToLast)
            .build()
            .unwrap();
        let df = df!("v" => Vec::<i64>::new()).unwrap();

        let outcome = pipeline(&client, config).run(&df).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(client.call_count(), 0);
    }

    struct FailingCleaner;

    impl RuleBasedCleaner for FailingCleaner {
        fn clean(&self, _df: &DataFrame) -> anyhow::Result<DataFrame> {
            Err(anyhow::anyhow!("column 'age' is not numeric").context("imputation failed"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_rule_cleaner_error_keeps_its_cause() {
        let client = ScriptedModelClient::new();
        let err = Pipeline::builder()
            .model_client(Arc::new(client.clone()))
            .cleaner(Arc::new(FailingCleaner))
            .build()
            .unwrap()
            .run(&df!("v" => &[1i64]).unwrap())
            .unwrap_err();

        assert_eq!(err.error_code(), "RULE_CLEANING_FAILED");
        let CleaningError::RuleCleaningFailed(cause) = &err else {
            panic!("expected rule cleaning failure, got {:?}", err);
        };
        assert_eq!(cause.to_string(), "imputation failed");
        assert_eq!(cause.root_cause().to_string(), "column 'age' is not numeric");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn test_table_fallback_recovers_csv_answer() {
        let client = ScriptedModelClient::new();
        client
            .push_message("[{\"name\":\"Alice\",\"age\":30}]")
            .push_message("Cleaned batch:\n```\nname,age\nBob,41\n```");
        let df = df!("name" => &["alice", "bob"], "age" => &[30i64, 41]).unwrap();

        let err = pipeline(&client, CleaningConfig::builder().batch_size(1).build().unwrap())
            .run(&df)
            .unwrap_err();
        assert_eq!(err.batch_index(), Some(1));

        client
            .push_message("[{\"name\":\"Alice\",\"age\":30}]")
            .push_message("Cleaned batch:\n```\nname,age\nBob,41\n```");
        let config = CleaningConfig::builder()
            .batch_size(1)
            .extraction_mode(ExtractionMode::PerBatchWithTableFallback)
            .build()
            .unwrap();
        let outcome = pipeline(&client, config).run(&df).unwrap();

        assert_eq!(
            outcome.records,
            vec![json!({"name": "Alice", "age": 30}), json!({"name": "Bob", "age": 41})]
        );
        assert_eq!(outcome.table.shape(), (2, 2));
    }

    #[cfg(feature = "ai")]
    #[test]
    fn test_run_async() {
        let client = ScriptedModelClient::new();
        client.push_message("[{\"v\":1}]");
        let pipeline = Arc::new(pipeline(&client, CleaningConfig::default()));
        let df = df!("v" => &[1i64]).unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let outcome = runtime.block_on(pipeline.run_async(df)).unwrap();
        assert_eq!(outcome.records, vec![json!({"v": 1})]);
    }
}
