//! HTTP dataset source.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::data::{DatasetSource, dataset_file_name};
use crate::domain::Table;
use crate::error::{AppError, BlendError};
use crate::io::table::read_table;

const DEFAULT_EXTENSION: &str = "csv";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where datasets live and how long a single fetch may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub base_url: String,
    pub extension: String,
    pub timeout: Duration,
}

impl SourceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read `BLEND_BASE_URL`, `BLEND_FILE_EXT` and `BLEND_TIMEOUT_SECS` (after loading `.env`).
    ///
    /// `base_url` overrides the environment when given.
    pub fn from_env(base_url: Option<String>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = match base_url {
            Some(url) => url,
            None => std::env::var("BLEND_BASE_URL")
                .map_err(|_| AppError::new(2, "Missing BLEND_BASE_URL in environment (.env) and no --base-url given."))?,
        };

        let mut config = Self::new(base_url);
        if let Ok(ext) = std::env::var("BLEND_FILE_EXT") {
            let ext = ext.trim().trim_start_matches('.');
            if !ext.is_empty() {
                config.extension = ext.to_string();
            }
        }
        if let Ok(raw) = std::env::var("BLEND_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| AppError::new(2, format!("Invalid BLEND_TIMEOUT_SECS '{raw}': {e}")))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn dataset_url(&self, year: i32, scenario: &str) -> String {
        let file = dataset_file_name(year, scenario, &self.extension);
        if self.base_url.ends_with('/') {
            format!("{}{file}", self.base_url)
        } else {
            format!("{}/{file}", self.base_url)
        }
    }
}

pub struct HttpDatasetSource {
    client: Client,
    config: SourceConfig,
}

impl HttpDatasetSource {
    pub fn new(config: SourceConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

impl DatasetSource for HttpDatasetSource {
    fn fetch(&self, year: i32, scenario: &str) -> Result<Table, BlendError> {
        let url = self.config.dataset_url(year, scenario);
        let retrieval = |reason: String| BlendError::Retrieval {
            url: url.clone(),
            reason,
        };

        debug!(%url, "fetching dataset");
        let resp = self.client.get(&url).send().map_err(|e| {
            if e.is_timeout() {
                retrieval(format!("timed out after {}s", self.config.timeout.as_secs()))
            } else {
                retrieval(format!("request failed: {e}"))
            }
        })?;

        if !resp.status().is_success() {
            return Err(retrieval(format!("status {}", resp.status())));
        }

        let body = resp.bytes().map_err(|e| {
            if e.is_timeout() {
                retrieval(format!("timed out after {}s", self.config.timeout.as_secs()))
            } else {
                retrieval(format!("failed to read body: {e}"))
            }
        })?;

        let table = read_table(body.as_ref()).map_err(retrieval)?;
        debug!(%url, rows = table.len(), columns = table.columns().len(), "dataset parsed");
        Ok(table)
    }
}
