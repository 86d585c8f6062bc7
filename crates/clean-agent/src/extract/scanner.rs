//! JSON-aware array scanner.

use super::table_text::parse_table_text;
use crate::error::{CleaningError, Result};
use crate::types::CombinedResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

static REASONING_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid reasoning block regex"));

/// Remove `<think>...</think>` blocks emitted by reasoning models.
pub fn strip_reasoning(text: &str) -> Cow<'_, str> {
    REASONING_BLOCK.replace_all(text, "")
}

/// Every balanced top-level JSON array in `text`, in order of appearance.
///
/// Brackets inside JSON string literals do not count toward nesting. A
/// balanced candidate that does not parse is skipped and scanning resumes
/// right after its opening bracket, so an array nested inside it can still
/// be found.
pub fn scan_arrays(text: &str) -> Vec<Vec<Value>> {
    let text = strip_reasoning(text);
    let bytes = text.as_bytes();
    let mut arrays = Vec::new();
    let mut pos = 0;

    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'[') {
        let start = pos + offset;
        let Some(end) = balanced_end(bytes, start) else {
            pos = start + 1;
            continue;
        };

        let candidate = &text[start..=end];
        match serde_json::from_str::<Vec<Value>>(candidate) {
            Ok(items) => {
                arrays.push(items);
                pos = end + 1;
            }
            Err(e) => {
                warn!(
                    offset = start,
                    error = %e,
                    "Skipping bracketed text that is not a JSON array"
                );
                pos = start + 1;
            }
        }
    }

    arrays
}

/// Index of the `]` closing the `[` at `start`, if any.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// One record sequence per batch response, in batch order.
///
/// From each response the first non-empty array whose elements are all
/// objects wins; failing that, the first non-empty array, then the first
/// array found.
///
/// # Errors
///
/// [`CleaningError::MalformedModelOutput`] naming the first batch whose
/// response holds no JSON array, with that response as `raw`.
pub fn extract_batches(combined: &CombinedResult) -> Result<Vec<Vec<Value>>> {
    recover_batches(combined, false)
}

/// Like [`extract_batches`], but a response without any JSON array is read
/// as a CSV table before the batch is declared malformed.
pub fn extract_batches_with_tables(combined: &CombinedResult) -> Result<Vec<Vec<Value>>> {
    recover_batches(combined, true)
}

fn recover_batches(combined: &CombinedResult, table_fallback: bool) -> Result<Vec<Vec<Value>>> {
    combined
        .responses()
        .iter()
        .enumerate()
        .map(|(index, response)| {
            let mut arrays = scan_arrays(response);
            if arrays.is_empty() {
                if table_fallback {
                    if let Some(records) = parse_table_text(response) {
                        debug!(batch = index, records = records.len(), "Recovered batch from CSV table");
                        return Ok(records);
                    }
                }
                return Err(CleaningError::MalformedModelOutput {
                    batch: Some(index),
                    reason: if table_fallback {
                        "no JSON array or CSV table found".to_string()
                    } else {
                        "no JSON array found".to_string()
                    },
                    raw: response.clone(),
                });
            }

            let pick = pick_records(&arrays);
            debug!(
                batch = index,
                arrays = arrays.len(),
                picked = pick,
                "Recovered batch records"
            );
            Ok(arrays.swap_remove(pick))
        })
        .collect()
}

/// Index of the array most likely to hold the batch's records.
fn pick_records(arrays: &[Vec<Value>]) -> usize {
    arrays
        .iter()
        .position(|items| !items.is_empty() && items.iter().all(Value::is_object))
        .or_else(|| arrays.iter().position(|items| !items.is_empty()))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scan_finds_every_array() {
        let arrays = scan_arrays("[{\"a\":1}]\n[{\"b\":2}]");
        assert_eq!(arrays, vec![vec![json!({"a": 1})], vec![json!({"b": 2})]]);
    }

    #[test]
    fn test_scan_ignores_brackets_in_strings() {
        let arrays = scan_arrays(r#"result: [{"note": "see [1] and ]"}] done"#);
        assert_eq!(arrays, vec![vec![json!({"note": "see [1] and ]"})]]);
    }

    #[test]
    fn test_scan_handles_escaped_quotes() {
        let arrays = scan_arrays(r#"[{"q": "say \"[hi]\""}]"#);
        assert_eq!(arrays.len(), 1);
        assert_eq!(arrays[0][0]["q"], json!("say \"[hi]\""));
    }

    #[test]
    fn test_scan_skips_prose_brackets() {
        let arrays = scan_arrays("Rows [0..3] cleaned:\n[{\"a\":1}]");
        assert_eq!(arrays, vec![vec![json!({"a": 1})]]);
    }

    #[test]
    fn test_scan_recovers_nested_array_from_broken_outer() {
        let arrays = scan_arrays("[oops [1, 2] ]");
        assert_eq!(arrays, vec![vec![json!(1), json!(2)]]);
    }

    #[test]
    fn test_scan_unterminated_array() {
        assert!(scan_arrays("[{\"a\": 1}").is_empty());
    }

    #[test]
    fn test_reasoning_block_is_stripped() {
        let text = "<think>maybe [x] or [y]?\n[1]</think>\n[{\"a\":1}]";
        assert_eq!(scan_arrays(text), vec![vec![json!({"a": 1})]]);
    }

    #[test]
    fn test_scan_handles_multibyte_text() {
        let arrays = scan_arrays("Voilà – données: [{\"nom\":\"Zoë\"}]");
        assert_eq!(arrays, vec![vec![json!({"nom": "Zoë"})]]);
    }

    #[test]
    fn test_extract_batches_one_sequence_per_batch() {
        let combined = CombinedResult::new(vec![
            "Cleaned:\n[{\"a\":1}]".to_string(),
            "```json\n[{\"b\":2}]\n```".to_string(),
        ]);
        let batches = extract_batches(&combined).unwrap();
        assert_eq!(batches, vec![vec![json!({"a": 1})], vec![json!({"b": 2})]]);
    }

    #[test]
    fn test_extract_batches_prefers_record_arrays() {
        let combined = CombinedResult::new(vec![
            "Columns [\"a\"] became:\n[{\"a\":1}]".to_string(),
        ]);
        let batches = extract_batches(&combined).unwrap();
        assert_eq!(batches, vec![vec![json!({"a": 1})]]);
    }

    #[test]
    fn test_extract_batches_names_failing_batch() {
        let combined = CombinedResult::new(vec![
            "[{\"a\":1}]".to_string(),
            "Sorry, I cannot help with that.".to_string(),
        ]);
        let err = extract_batches(&combined).unwrap_err();
        assert_eq!(err.batch_index(), Some(1));
        assert_eq!(err.raw_output(), Some("Sorry, I cannot help with that."));
    }

    #[test]
    fn test_extract_batches_is_pure() {
        let combined = CombinedResult::new(vec!["[1] [{\"a\":1}]".to_string()]);
        assert_eq!(
            extract_batches(&combined).unwrap(),
            extract_batches(&combined).unwrap()
        );
    }

    #[test]
    fn test_extract_batches_skips_empty_array_in_prose() {
        let combined = CombinedResult::new(vec![
            "Columns with missing values: []\nCleaned data:\n[{\"name\":\"Alice\"},{\"name\":\"Bob\"}]"
                .to_string(),
        ]);
        let batches = extract_batches(&combined).unwrap();
        assert_eq!(
            batches,
            vec![vec![json!({"name": "Alice"}), json!({"name": "Bob"})]]
        );
    }

    #[test]
    fn test_pick_records_falls_back_to_non_empty_then_first() {
        assert_eq!(pick_records(&[vec![], vec![json!(1)], vec![json!({"a": 1})]]), 2);
        assert_eq!(pick_records(&[vec![], vec![json!(1), json!(2)]]), 1);
        assert_eq!(pick_records(&[vec![], vec![]]), 0);
    }

    #[test]
    fn test_extract_batches_with_tables_reads_csv_answer() {
        let combined = CombinedResult::new(vec![
            "[{\"name\":\"Alice\",\"age\":30}]".to_string(),
            "Here is the cleaned data:\n\nname,age\nBob,41\nCarol,25\n".to_string(),
        ]);

        assert_eq!(extract_batches(&combined).unwrap_err().batch_index(), Some(1));
        assert_eq!(
            extract_batches_with_tables(&combined).unwrap(),
            vec![
                vec![json!({"name": "Alice", "age": 30})],
                vec![
                    json!({"name": "Bob", "age": 41}),
                    json!({"name": "Carol", "age": 25})
                ],
            ]
        );
    }

    #[test]
    fn test_extract_batches_with_tables_still_rejects_prose() {
        let combined = CombinedResult::new(vec!["Sorry, I cannot help with that.".to_string()]);
        let err = extract_batches_with_tables(&combined).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_MODEL_OUTPUT");
        assert_eq!(err.batch_index(), Some(0));
    }
}
