//! CSV tables embedded in model prose.

use super::scanner::strip_reasoning;
use crate::table::table_to_records;
use polars::prelude::*;
use serde_json::Value;
use std::io::Cursor;
use tracing::debug;

/// Read the first comma-separated block in `text` as a CSV table with a
/// header row.
///
/// The block starts at the first line holding a comma and runs until a line
/// without one. Code fences and blank lines are skipped. Returns `None` when
/// no block is found, it does not parse, or it has fewer than two columns or
/// no data rows.
pub fn parse_table_text(text: &str) -> Option<Vec<Value>> {
    let text = strip_reasoning(text);
    let block: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .skip_while(|line| !line.contains(','))
        .take_while(|line| line.contains(','))
        .collect();

    if block.len() < 2 {
        return None;
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(block.len()))
        .into_reader_with_file_handle(Cursor::new(block.join("\n")))
        .finish();

    match df {
        Ok(df) if df.width() >= 2 && df.height() > 0 => Some(table_to_records(&df)),
        Ok(df) => {
            debug!(shape = ?df.shape(), "Comma-separated block is not a table");
            None
        }
        Err(e) => {
            debug!(error = %e, "Comma-separated block does not parse as CSV");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_fenced_table_after_prose() {
        let text = "Cleaned rows below.\n```csv\nname,city\nAlice Smith,Paris\nBob Jones,Lyon\n```\nDone.";
        assert_eq!(
            parse_table_text(text),
            Some(vec![
                json!({"name": "Alice Smith", "city": "Paris"}),
                json!({"name": "Bob Jones", "city": "Lyon"}),
            ])
        );
    }

    #[test]
    fn test_numeric_columns_keep_their_type() {
        let records = parse_table_text("age,salary\n30,1200.5\n41,980").unwrap();
        assert_eq!(records[0], json!({"age": 30, "salary": 1200.5}));
    }

    #[test]
    fn test_reasoning_block_is_ignored() {
        let text = "<think>a,b\n1,2</think>\nname,age\nAlice,30";
        assert_eq!(
            parse_table_text(text),
            Some(vec![json!({"name": "Alice", "age": 30})])
        );
    }

    #[test]
    fn test_header_without_rows_is_rejected() {
        assert_eq!(parse_table_text("name,age"), None);
        assert_eq!(parse_table_text("Sorry, I cannot help with that."), None);
    }

    #[test]
    fn test_plain_prose_is_rejected() {
        assert_eq!(parse_table_text("No table here.\nStill nothing."), None);
    }
}
