//! Spreadsheet workbooks.

use super::{table_from_rows, TableSource};
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::DataFrame;
use serde_json::Value;
use std::path::PathBuf;

/// One worksheet of an `.xlsx`, `.xlsm`, `.xls` or `.ods` workbook.
///
/// The first row holds the column names. Whole-number cells are read as
/// integers, empty cells as nulls.
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    path: PathBuf,
    sheet: Option<String>,
}

impl SpreadsheetSource {
    /// Read the first worksheet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheet: None,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

impl TableSource for SpreadsheetSource {
    fn load(&self) -> Result<DataFrame> {
        let mut workbook = open_workbook_auto(&self.path)
            .with_context(|| format!("Could not open workbook {}", self.path.display()))?;

        let range = match &self.sheet {
            Some(name) => workbook
                .worksheet_range(name)
                .with_context(|| format!("Could not read sheet '{}'", name))?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| anyhow!("{} has no worksheets", self.path.display()))?
                .context("Could not read the first worksheet")?,
        };

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(DataFrame::empty());
        };
        let names: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("column_{}", i + 1),
                other => other.to_string(),
            })
            .collect();
        let values: Vec<Vec<Value>> = rows
            .map(|row| row.iter().map(cell_to_json).collect())
            .collect();

        Ok(table_from_rows(&names, values)?)
    }

    fn describe(&self) -> String {
        match &self.sheet {
            Some(sheet) => format!("Spreadsheet {} (sheet '{}')", self.path.display(), sheet),
            None => format!("Spreadsheet {}", self.path.display()),
        }
    }
}

fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Value::from(*f as i64)
        }
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}
