//! Pushes leasing datasets to the backend's sync endpoint.
//!
//! Datasets are sent one at a time. A dataset within `chunk_rows` is one
//! plain request; a larger one is split into chunks flagged with the
//! `x-leasing-sync-*` headers so the server can truncate on the first chunk
//! and record the hash on the last.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};
use stoactl_core::leasing::sync::{
    plan_chunks, SyncReport, CHUNK_ROWS, HEADER_DATA_HASH, HEADER_FIRST_CHUNK, HEADER_LAST_CHUNK,
    HEADER_TOTAL_ROWS,
};
use stoactl_core::leasing::{data_hash, DatasetKey, RawRow};

use crate::client::check_status;
use crate::error::{DomoError, Result};

pub const SYNC_PATH: &str = "/api/leasing/sync";

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub chunk_rows: usize,
    /// Pause between datasets
    pub dataset_pause: Duration,
    /// Pause between chunks of one dataset
    pub chunk_pause: Duration,
    pub timeout: Duration,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            chunk_rows: CHUNK_ROWS,
            dataset_pause: Duration::from_secs(2),
            chunk_pause: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
        }
    }
}

/// One dataset ready to push
#[derive(Debug, Clone)]
pub struct DatasetPayload {
    pub key: DatasetKey,
    pub rows: Vec<RawRow>,
}

pub struct PushClient {
    client: Client,
    sync_url: String,
    options: PushOptions,
}

impl PushClient {
    pub fn new(api_base_url: &str, options: PushOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self {
            client,
            sync_url: format!("{}{}", api_base_url.trim_end_matches('/'), SYNC_PATH),
            options,
        })
    }

    pub fn sync_url(&self) -> &str {
        &self.sync_url
    }

    /// Push every dataset, one after another, pausing `dataset_pause` between them.
    ///
    /// A dataset within `chunk_rows` goes as a single request without chunk
    /// headers; larger ones are chunked. Transport or status failures abort
    /// only the affected dataset and land in the report's errors.
    pub async fn push(&self, datasets: &[DatasetPayload]) -> SyncReport {
        let mut report = SyncReport::new();
        for (i, dataset) in datasets.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.options.dataset_pause).await;
            }
            let pushed = if dataset.rows.len() > self.options.chunk_rows {
                self.push_chunked(dataset).await
            } else {
                self.push_one(dataset).await
            };
            match pushed {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    tracing::error!(dataset = %dataset.key, error = %e, "dataset push aborted");
                    report.error(dataset.key.as_str(), e.to_string());
                }
            }
        }
        report
    }

    async fn push_one(&self, dataset: &DatasetPayload) -> Result<SyncReport> {
        let mut body = Map::new();
        body.insert(
            dataset.key.as_str().to_owned(),
            Value::Array(dataset.rows.iter().cloned().map(Value::Object).collect()),
        );
        tracing::info!(dataset = %dataset.key, rows = dataset.rows.len(), url = %self.sync_url, "pushing dataset");
        let response = self
            .client
            .post(&self.sync_url)
            .json(&Value::Object(body))
            .send()
            .await?;
        read_report(&self.sync_url, response).await
    }

    async fn push_chunked(&self, dataset: &DatasetPayload) -> Result<SyncReport> {
        let plan = plan_chunks(dataset.rows.len(), self.options.chunk_rows);
        if plan.is_empty() {
            return self.push_one(dataset).await;
        }

        let total = dataset.rows.len();
        let hash = data_hash(&dataset.rows);
        let mut report = SyncReport::new();

        for chunk in &plan {
            if !chunk.is_first() {
                tokio::time::sleep(self.options.chunk_pause).await;
            }
            let rows: Vec<Value> = dataset.rows[chunk.start..chunk.end]
                .iter()
                .cloned()
                .map(Value::Object)
                .collect();
            let mut body = Map::new();
            body.insert(dataset.key.as_str().to_owned(), Value::Array(rows));

            let mut request = self
                .client
                .post(&self.sync_url)
                .header(HEADER_FIRST_CHUNK, chunk.is_first().to_string())
                .header(HEADER_LAST_CHUNK, chunk.is_last().to_string())
                .json(&Value::Object(body));
            if chunk.is_last() {
                request = request
                    .header(HEADER_TOTAL_ROWS, total.to_string())
                    .header(HEADER_DATA_HASH, hash.as_str());
            }

            tracing::info!(
                dataset = %dataset.key,
                chunk = %chunk.label(),
                rows = chunk.end - chunk.start,
                "pushing chunk"
            );
            let response = request.send().await?;
            let partial = read_report(&self.sync_url, response).await?;
            if partial.has_errors() {
                report.merge(partial);
                return Ok(report);
            }
            report.merge(partial);
        }
        Ok(report)
    }
}

async fn read_report(url: &str, response: reqwest::Response) -> Result<SyncReport> {
    let response = check_status(url, response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| DomoError::json("sync response", e))
}
