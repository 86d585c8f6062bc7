//! Local JSON files.

use super::TableSource;
use crate::table::table_from_json;
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use serde_json::Value;
use std::path::PathBuf;

/// A JSON file holding either an array of records or an object of columns.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableSource for JsonFileSource {
    fn load(&self) -> Result<DataFrame> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("{} is not valid JSON", self.path.display()))?;
        Ok(table_from_json(&value)?)
    }

    fn describe(&self) -> String {
        format!("JSON file {}", self.path.display())
    }
}
