//! Table sources.
//!
//! A source produces the [`DataFrame`] handed to the pipeline. Loading is
//! plain I/O; none of it is part of the cleaning logic.

mod csv;
#[cfg(feature = "ai")]
mod http;
mod json;
mod spreadsheet;
mod sqlite;

pub use csv::CsvSource;
#[cfg(feature = "ai")]
pub use http::HttpJsonSource;
pub use json::JsonFileSource;
pub use spreadsheet::SpreadsheetSource;
pub use sqlite::SqliteQuerySource;

use crate::error::{CleaningError, Result};
use crate::table::records_to_table;
use anyhow::Result as AnyResult;
use polars::prelude::{Column, DataFrame, DataType};
use serde_json::{Map, Value};
use std::path::Path;

/// Something that can produce a table.
pub trait TableSource: Send + Sync {
    fn load(&self) -> AnyResult<DataFrame>;

    /// Human-readable origin, for logs and summaries.
    fn describe(&self) -> String;
}

/// Pick a source for a local file by its extension.
///
/// # Errors
///
/// [`CleaningError::SourceFailed`] for anything other than `.csv`, `.json` or
/// a spreadsheet (`.xlsx`, `.xlsm`, `.xls`, `.ods`).
pub fn source_for_path(path: impl AsRef<Path>) -> Result<Box<dyn TableSource>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => Ok(Box::new(CsvSource::new(path))),
        Some("json") => Ok(Box::new(JsonFileSource::new(path))),
        Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(Box::new(SpreadsheetSource::new(path))),
        Some(other) => Err(CleaningError::SourceFailed(format!(
            "unsupported file type '.{}' for {} (expected .csv, .json or a spreadsheet)",
            other,
            path.display()
        ))),
        None => Err(CleaningError::SourceFailed(format!(
            "cannot tell the file type of {}",
            path.display()
        ))),
    }
}

/// Build a table from named columns and positional rows.
///
/// Short rows are padded with nulls. With no rows, the columns are kept as
/// empty String columns.
pub(crate) fn table_from_rows(names: &[String], rows: Vec<Vec<Value>>) -> Result<DataFrame> {
    if rows.is_empty() {
        let columns: Vec<Column> = names
            .iter()
            .map(|name| Column::new_empty(name.as_str().into(), &DataType::String))
            .collect();
        return Ok(DataFrame::new(columns)?);
    }

    let records: Vec<Value> = rows
        .into_iter()
        .map(|row| {
            let mut cells = row.into_iter();
            let record: Map<String, Value> = names
                .iter()
                .map(|name| (name.clone(), cells.next().unwrap_or(Value::Null)))
                .collect();
            Value::Object(record)
        })
        .collect();
    records_to_table(&records)
}
