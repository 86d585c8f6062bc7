//! JSON tables fetched over HTTP.

use super::TableSource;
use crate::table::table_from_json;
use anyhow::{anyhow, Context, Result};
use polars::prelude::DataFrame;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// An HTTP endpoint answering a GET with an array of records or an object of
/// columns.
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    url: String,
    timeout: Duration,
}

impl HttpJsonSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl TableSource for HttpJsonSource {
    fn load(&self) -> Result<DataFrame> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        debug!("Fetching table from {}", self.url);
        let response = client
            .get(&self.url)
            .send()
            .with_context(|| format!("Request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("{} returned {}: {}", self.url, status, body));
        }

        let value: Value = response
            .json()
            .with_context(|| format!("{} did not return JSON", self.url))?;
        Ok(table_from_json(&value)?)
    }

    fn describe(&self) -> String {
        format!("HTTP endpoint {}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_names_url() {
        let source = HttpJsonSource::new("https://example.com/data").with_timeout(Duration::from_secs(1));
        assert_eq!(source.describe(), "HTTP endpoint https://example.com/data");
    }

    #[test]
    fn test_unreachable_endpoint_is_an_error() {
        let source = HttpJsonSource::new("http://127.0.0.1:9/data").with_timeout(Duration::from_millis(200));
        assert!(source.load().is_err());
    }
}
