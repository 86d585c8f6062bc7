//! Recovering structured records from model text.
//!
//! Two extractors are provided:
//!
//! - [`extract`] slices from the first `[` to the last `]` of the whole text
//!   and parses that slice. It only works when the text holds exactly one
//!   array, which is rarely true once more than one batch has answered.
//! - [`scan_arrays`] / [`extract_batches`] walk the text with a JSON-aware
//!   scanner and return one record sequence per batch.
//!   [`extract_batches_with_tables`] additionally reads a response holding no
//!   JSON array as a CSV table.
//!
//! Both are pure functions of their input.

mod scanner;
mod table_text;

pub use scanner::{extract_batches, extract_batches_with_tables, scan_arrays, strip_reasoning};
pub use table_text::parse_table_text;

use crate::error::{CleaningError, Result};
use serde_json::Value;

/// Parse the slice between the first `[` and the last `]` of `text`.
///
/// # Errors
///
/// [`CleaningError::MalformedModelOutput`] carrying the whole `text` when
/// either bracket is missing or the slice is not a JSON array.
///
/// # Example
///
/// ```rust,ignore
/// let records = extract(r#"noise [ {"a":1} , {"a":2} ] trailing"#)?;
/// assert_eq!(records.len(), 2);
/// ```
pub fn extract(text: &str) -> Result<Vec<Value>> {
    let malformed = |reason: String| CleaningError::MalformedModelOutput {
        batch: None,
        reason,
        raw: text.to_string(),
    };

    let start = text
        .find('[')
        .ok_or_else(|| malformed("no '[' found".to_string()))?;
    let end = text
        .rfind(']')
        .ok_or_else(|| malformed("no ']' found".to_string()))?;
    if end < start {
        return Err(malformed("last ']' comes before first '['".to_string()));
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(malformed("bracketed slice is not a JSON array".to_string())),
        Err(e) => Err(malformed(format!("bracketed slice is not valid JSON: {}", e))),
    }
}
