//! Conversions between polars tables, prompt text, and JSON records.
//!
//! The model sees a plain fixed-width dump of each batch (polars' own
//! `Display` truncates long frames, which would silently drop rows from the
//! prompt). Its answer comes back as JSON records, which are turned back into
//! a `DataFrame` here.

use crate::error::{CleaningError, Result};
use crate::types::BatchSpan;
use crate::utils::format_any_value;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Split `rows` into consecutive spans of at most `batch_size` rows.
///
/// `batch_size` must be non-zero; callers validate it first.
pub fn batch_spans(rows: usize, batch_size: usize) -> Vec<BatchSpan> {
    (0..rows)
        .step_by(batch_size)
        .enumerate()
        .map(|(index, start)| BatchSpan {
            index,
            start,
            end: (start + batch_size).min(rows),
        })
        .collect()
}

/// Rows `[span.start, span.end)` of a table, in original order.
pub fn slice_batch(df: &DataFrame, span: &BatchSpan) -> DataFrame {
    df.slice(span.start as i64, span.len())
}

/// Render a table as aligned text, numbering rows from `first_row`.
pub fn render_table(df: &DataFrame, first_row: usize) -> String {
    let mut header = vec![String::new()];
    header.extend(df.get_column_names().iter().map(|name| name.to_string()));

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut cells = Vec::with_capacity(df.width() + 1);
        cells.push((first_row + i).to_string());
        for column in df.get_columns() {
            let cell = column
                .as_materialized_series()
                .get(i)
                .map(|v| format_any_value(&v))
                .unwrap_or_else(|_| "null".to_string());
            cells.push(cell);
        }
        rows.push(cells);
    }

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in std::iter::once(&header).chain(rows.iter()) {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:>width$}", cell, width = width))
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// Build a table from a JSON value.
///
/// Accepts either an array of records or an object mapping column names to
/// equal-length arrays.
pub fn table_from_json(value: &Value) -> Result<DataFrame> {
    match value {
        Value::Array(records) => records_to_table(records),
        Value::Object(columns) => {
            let mut heights = columns.values().map(|v| v.as_array().map(Vec::len));
            let height = match heights.next() {
                None => return Ok(DataFrame::empty()),
                Some(Some(h)) => h,
                Some(None) => {
                    return Err(CleaningError::SourceFailed(
                        "column-oriented JSON must map names to arrays".to_string(),
                    ));
                }
            };
            if heights.any(|h| h != Some(height)) {
                return Err(CleaningError::SourceFailed(
                    "column arrays have different lengths".to_string(),
                ));
            }

            let records: Vec<Value> = (0..height)
                .map(|i| {
                    let record: Map<String, Value> = columns
                        .iter()
                        .map(|(name, values)| (name.clone(), values[i].clone()))
                        .collect();
                    Value::Object(record)
                })
                .collect();
            records_to_table(&records)
        }
        other => Err(CleaningError::SourceFailed(format!(
            "expected a JSON array or object, found {}",
            json_kind(other)
        ))),
    }
}

/// Build a table from JSON records.
///
/// Columns appear in first-seen key order. Keys missing from a record become
/// nulls. Each column takes the narrowest type that fits every non-null value:
/// Boolean, Int64, Float64, otherwise String.
pub fn records_to_table(records: &[Value]) -> Result<DataFrame> {
    let mut names: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut objects: Vec<&Map<String, Value>> = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let Value::Object(map) = record else {
            return Err(CleaningError::UnexpectedRecordShape {
                index,
                found: json_kind(record),
            });
        };
        for key in map.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
        objects.push(map);
    }

    if names.is_empty() {
        return Ok(DataFrame::empty());
    }

    let columns: Vec<Column> = names
        .iter()
        .map(|name| {
            let values: Vec<&Value> = objects
                .iter()
                .map(|map| map.get(name).unwrap_or(&Value::Null))
                .collect();
            json_column(name, &values).into_column()
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Convert a table back into JSON records.
pub fn table_to_records(df: &DataFrame) -> Vec<Value> {
    let names = df.get_column_names();
    (0..df.height())
        .map(|i| {
            let record: Map<String, Value> = names
                .iter()
                .zip(df.get_columns())
                .map(|(name, column)| {
                    let value = column
                        .as_materialized_series()
                        .get(i)
                        .map(|v| any_value_to_json(&v))
                        .unwrap_or(Value::Null);
                    (name.to_string(), value)
                })
                .collect();
            Value::Object(record)
        })
        .collect()
}

fn json_column(name: &str, values: &[&Value]) -> Series {
    let non_null = || values.iter().filter(|v| !v.is_null());

    if non_null().all(|v| v.is_boolean()) {
        let data: Vec<Option<bool>> = values.iter().map(|v| v.as_bool()).collect();
        Series::new(name.into(), data)
    } else if non_null().all(|v| v.is_i64()) {
        let data: Vec<Option<i64>> = values.iter().map(|v| v.as_i64()).collect();
        Series::new(name.into(), data)
    } else if non_null().all(|v| v.is_number()) {
        let data: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
        Series::new(name.into(), data)
    } else {
        let data: Vec<Option<String>> = values
            .iter()
            .map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect();
        Series::new(name.into(), data)
    }
}

fn any_value_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int8(v) => Value::from(*v),
        AnyValue::Int16(v) => Value::from(*v),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::UInt8(v) => Value::from(*v),
        AnyValue::UInt16(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::Float32(v) => Value::from(*v as f64),
        AnyValue::Float64(v) => Value::from(*v),
        other => Value::String(format!("{}", other)),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
