//! Rule-based cleaning that runs before the model sees the data.
//!
//! This module provides:
//! - The [`RuleBasedCleaner`] collaborator trait
//! - [`DataCleaner`]: duplicate removal plus mean/mode imputation
//! - [`PassthroughCleaner`]: returns its input unchanged

use crate::utils::{fill_numeric_nulls, fill_string_nulls, get_dtype_category, string_mode, DtypeCategory};
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Turns a rectangular table into a new rectangular table.
///
/// Implementations must not mutate their input.
pub trait RuleBasedCleaner: Send + Sync {
    fn clean(&self, df: &DataFrame) -> Result<DataFrame>;

    /// Cleaner name for logging.
    fn name(&self) -> &str;
}

/// Deterministic cleaning rules.
///
/// 1. Remove duplicate rows, keeping the first occurrence and row order
/// 2. Fill nulls in numeric columns with the column mean
/// 3. Fill nulls in string columns with the column mode
///
/// Columns that are entirely null are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataCleaner;

impl DataCleaner {
    fn remove_duplicates(df: &DataFrame) -> Result<DataFrame> {
        let before = df.height();
        let deduped = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
        let removed = before - deduped.height();
        if removed > 0 {
            debug!("Removed {} duplicate rows", removed);
        } else {
            debug!("No duplicate rows found");
        }
        Ok(deduped)
    }

    fn impute(df: &mut DataFrame) -> Result<usize> {
        let targets: Vec<(String, DataType)> = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > 0 && col.null_count() < col.len())
            .map(|col| (col.name().to_string(), col.dtype().clone()))
            .collect();

        let mut filled = 0;
        for (name, dtype) in targets {
            let series = df.column(&name)?.as_materialized_series().clone();
            let replacement = match get_dtype_category(&dtype) {
                DtypeCategory::Numeric => match series.mean() {
                    Some(mean) => {
                        debug!("Filling '{}' with mean {:.4}", name, mean);
                        fill_numeric_nulls(&series, mean)?
                    }
                    None => continue,
                },
                DtypeCategory::String => match string_mode(&series) {
                    Some(mode) => {
                        debug!("Filling '{}' with mode '{}'", name, mode);
                        fill_string_nulls(&series, &mode)?
                    }
                    None => continue,
                },
                DtypeCategory::Boolean | DtypeCategory::Other => continue,
            };
            df.replace(&name, replacement)?;
            filled += 1;
        }
        Ok(filled)
    }
}

impl RuleBasedCleaner for DataCleaner {
    fn clean(&self, df: &DataFrame) -> Result<DataFrame> {
        if df.width() == 0 {
            return Ok(df.clone());
        }

        let mut cleaned = Self::remove_duplicates(df)?;
        let filled = Self::impute(&mut cleaned)?;

        info!(
            rows_before = df.height(),
            rows_after = cleaned.height(),
            columns_imputed = filled,
            "Rule-based cleaning complete"
        );
        Ok(cleaned)
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// A cleaner that changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCleaner;

impl RuleBasedCleaner for PassthroughCleaner {
    fn clean(&self, df: &DataFrame) -> Result<DataFrame> {
        Ok(df.clone())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
