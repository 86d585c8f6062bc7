//! SQLite query results.

use super::{table_from_rows, TableSource};
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// The result of one query against a SQLite database file.
///
/// The database is opened read-only and the query is passed to SQLite as
/// written.
#[derive(Debug, Clone)]
pub struct SqliteQuerySource {
    path: PathBuf,
    query: String,
}

impl SqliteQuerySource {
    pub fn new(path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }
}

impl TableSource for SqliteQuerySource {
    fn load(&self) -> Result<DataFrame> {
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Could not open database {}", self.path.display()))?;
        let mut stmt = conn
            .prepare(&self.query)
            .with_context(|| format!("Could not prepare query: {}", self.query))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let cells = (0..names.len())
                .map(|i| row.get_ref(i).map(sql_value_to_json))
                .collect::<rusqlite::Result<Vec<Value>>>()?;
            values.push(cells);
        }

        debug!(rows = values.len(), columns = names.len(), "Query returned");
        Ok(table_from_rows(&names, values)?)
    }

    fn describe(&self) -> String {
        format!("SQLite query on {}", self.path.display())
    }
}

fn sql_value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use polars::prelude::*;

    fn people_db(name: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("clean-agent-sqlite-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("people.db");
        std::fs::remove_file(&path).ok();

        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE people (name TEXT, age INTEGER, salary REAL);
             INSERT INTO people VALUES ('alice smith', 30, 52000.5);
             INSERT INTO people VALUES ('BOB JONES', NULL, 61000.0);
             INSERT INTO people VALUES ('carol white', 41, NULL);",
        )
        .unwrap();
        (dir, path)
    }

    #[test]
    fn test_query_becomes_table() {
        let (dir, path) = people_db("rows");

        let df = SqliteQuerySource::new(&path, "SELECT name, age, salary FROM people ORDER BY rowid")
            .load()
            .unwrap();

        assert_eq!(df.shape(), (3, 3));
        assert_eq!(df.get_column_names(), vec!["name", "age", "salary"]);
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("age").unwrap().null_count(), 1);
        assert_eq!(df.column("salary").unwrap().dtype(), &DataType::Float64);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_result_keeps_columns() {
        let (dir, path) = people_db("empty");

        let df = SqliteQuerySource::new(&path, "SELECT name, age FROM people WHERE age > 100")
            .load()
            .unwrap();
        assert_eq!(df.shape(), (0, 2));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_bad_query_and_missing_database_fail() {
        let (dir, path) = people_db("bad");
        assert!(SqliteQuerySource::new(&path, "SELECT * FROM missing").load().is_err());
        std::fs::remove_dir_all(&dir).ok();

        assert!(
            SqliteQuerySource::new("/nonexistent/clean-agent/people.db", "SELECT 1")
                .load()
                .is_err()
        );
    }

    #[test]
    fn test_database_is_opened_read_only() {
        let (dir, path) = people_db("readonly");
        assert!(SqliteQuerySource::new(&path, "DELETE FROM people").load().is_err());

        let df = SqliteQuerySource::new(&path, "SELECT * FROM people").load().unwrap();
        assert_eq!(df.height(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }
}
