//! CSV files.

use super::TableSource;
use anyhow::{Context, Result};
use polars::prelude::*;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::debug;

/// Rows scanned to infer column types.
const INFER_SCHEMA_ROWS: usize = 100;

/// A CSV file with a header row.
///
/// Loading tries, in order: a quote-aware parse, a parse without quote
/// handling, and finally a parse of the content with doubled quotes collapsed
/// and blank lines dropped.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self, parse_options: CsvParseOptions) -> PolarsResult<DataFrame> {
        CsvReadOptions::default()
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_has_header(true)
            .with_parse_options(parse_options)
            .try_into_reader_with_file_path(Some(self.path.clone()))?
            .finish()
    }
}

impl TableSource for CsvSource {
    fn load(&self) -> Result<DataFrame> {
        match self.read(CsvParseOptions::default().with_quote_char(Some(b'"'))) {
            Ok(df) => return Ok(df),
            Err(e) => debug!("Standard CSV parse of {} failed: {}", self.path.display(), e),
        }

        match self.read(CsvParseOptions::default().with_quote_char(None)) {
            Ok(df) => return Ok(df),
            Err(e) => debug!("CSV parse without quotes failed: {}", e),
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read {}", self.path.display()))?;
        CsvReadOptions::default()
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(clean_csv_content(&content)))
            .finish()
            .with_context(|| format!("Could not parse {} as CSV", self.path.display()))
    }

    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
