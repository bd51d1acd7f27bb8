//! Storing pushed or exported dataset rows.

use std::time::Duration;

use serde_json::{Map, Value};
use sqlx::{PgConnection, PgPool};
use stoactl_core::config::LeasingSection;
use stoactl_core::leasing::{data_hash, DatasetKey, RawRow, SyncReport};

use crate::db::repos::leasing::{
    insert_rows, record_sync, truncate, LeasingRepo, NewSyncLog, SyncSource, SyncStatus,
};
use crate::db::DbError;

/// Postgres allows 65535 bind parameters; each row binds two.
const MAX_BATCH_ROWS: usize = 30_000;

/// Chunk headers of one `POST /api/leasing/sync` request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkInfo {
    pub first: bool,
    pub last: bool,
    pub total_rows: Option<usize>,
    pub data_hash: Option<String>,
}

impl ChunkInfo {
    fn label(&self) -> &'static str {
        match (self.first, self.last) {
            (true, true) => "only",
            (true, false) => "first",
            (false, true) => "last",
            (false, false) => "middle",
        }
    }
}

/// Result of storing one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Synced { rows: usize },
    Skipped { reason: &'static str },
}

/// Convert a JSON array of objects into rows.
pub fn rows_from_value(value: Value) -> Result<Vec<RawRow>, String> {
    let Value::Array(items) = value else {
        return Err("expected an array of row objects".to_owned());
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(row) => Ok(row),
            _ => Err(format!("row {i} is not an object")),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Ingestor {
    pool: PgPool,
    batch_rows: usize,
    batch_pause: Duration,
}

impl Ingestor {
    pub fn new(pool: PgPool, settings: &LeasingSection) -> Self {
        Self {
            pool,
            batch_rows: settings.insert_batch_rows.clamp(1, MAX_BATCH_ROWS),
            batch_pause: Duration::from_millis(settings.batch_pause_ms),
        }
    }

    async fn insert_batched(
        &self,
        conn: &mut PgConnection,
        key: DatasetKey,
        rows: &[RawRow],
    ) -> Result<(), DbError> {
        let batches = rows.len().div_ceil(self.batch_rows);
        for (i, batch) in rows.chunks(self.batch_rows).enumerate() {
            insert_rows(&mut *conn, key, batch).await?;
            if i + 1 < batches && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }
        Ok(())
    }

    /// Replace a dataset wholesale unless its fingerprint is unchanged.
    pub async fn replace(
        &self,
        key: DatasetKey,
        rows: &[RawRow],
        source: SyncSource,
    ) -> Result<IngestOutcome, DbError> {
        let hash = data_hash(rows);
        let repo = LeasingRepo::new(&self.pool);

        if let Some(last) = repo.last_success(key).await? {
            let same_count = usize::try_from(last.row_count).is_ok_and(|n| n == rows.len());
            if same_count && last.data_hash.as_deref() == Some(hash.as_str()) {
                repo.record_sync(&NewSyncLog {
                    dataset: key,
                    row_count: rows.len(),
                    data_hash: Some(&hash),
                    source,
                    status: SyncStatus::Skipped,
                    message: Some("unchanged"),
                })
                .await?;
                tracing::info!(dataset = %key, rows = rows.len(), "dataset unchanged, skipped");
                return Ok(IngestOutcome::Skipped { reason: "unchanged" });
            }
        }

        let mut tx = self.pool.begin().await?;
        truncate(&mut tx, key).await?;
        self.insert_batched(&mut tx, key, rows).await?;
        record_sync(
            &mut tx,
            &NewSyncLog {
                dataset: key,
                row_count: rows.len(),
                data_hash: Some(&hash),
                source,
                status: SyncStatus::Synced,
                message: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(dataset = %key, rows = rows.len(), source = source.as_str(), "dataset replaced");
        Ok(IngestOutcome::Synced { rows: rows.len() })
    }

    /// Store one chunk of a multi-request upload.
    ///
    /// The first chunk truncates, the last writes the log entry.
    pub async fn store_chunk(
        &self,
        key: DatasetKey,
        rows: &[RawRow],
        chunk: &ChunkInfo,
    ) -> Result<usize, DbError> {
        let mut tx = self.pool.begin().await?;
        if chunk.first {
            truncate(&mut tx, key).await?;
        }
        self.insert_batched(&mut tx, key, rows).await?;
        if chunk.last {
            record_sync(
                &mut tx,
                &NewSyncLog {
                    dataset: key,
                    row_count: chunk.total_rows.unwrap_or(rows.len()),
                    data_hash: chunk.data_hash.as_deref(),
                    source: SyncSource::Push,
                    status: SyncStatus::Synced,
                    message: None,
                },
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(dataset = %key, rows = rows.len(), chunk = chunk.label(), "chunk stored");
        Ok(rows.len())
    }

    /// Log a failed attempt; logging problems are only warned about.
    pub async fn record_failure(&self, key: DatasetKey, source: SyncSource, message: &str) {
        let entry = NewSyncLog {
            dataset: key,
            row_count: 0,
            data_hash: None,
            source,
            status: SyncStatus::Failed,
            message: Some(message),
        };
        if let Err(e) = LeasingRepo::new(&self.pool).record_sync(&entry).await {
            tracing::warn!(dataset = %key, error = %e, "could not record failed sync");
        }
    }

    /// Apply a push body `{ "<dataset>": [rows...], ... }`.
    ///
    /// Problems with one dataset are reported and do not stop the others.
    pub async fn apply_push(&self, body: Map<String, Value>, chunk: Option<&ChunkInfo>) -> SyncReport {
        let mut report = SyncReport::new();

        for (name, value) in body {
            let key: DatasetKey = match name.parse() {
                Ok(key) => key,
                Err(_) => {
                    report.error(name.as_str(), format!("unknown dataset '{name}'"));
                    continue;
                }
            };
            let rows = match rows_from_value(value) {
                Ok(rows) => rows,
                Err(reason) => {
                    report.error(key.as_str(), reason);
                    continue;
                }
            };

            let result = match chunk {
                Some(chunk) => self
                    .store_chunk(key, &rows, chunk)
                    .await
                    .map(|n| (IngestOutcome::Synced { rows: n }, Some(chunk.label().to_owned()))),
                None => self
                    .replace(key, &rows, SyncSource::Push)
                    .await
                    .map(|outcome| (outcome, None)),
            };

            match result {
                Ok((IngestOutcome::Synced { rows }, label)) => report.synced(key.as_str(), rows, label),
                Ok((IngestOutcome::Skipped { reason }, _)) => report.skipped(key.as_str(), reason),
                Err(e) => {
                    tracing::error!(dataset = %key, error = %e, "ingest failed");
                    self.record_failure(key, SyncSource::Push, &e.to_string()).await;
                    report.error(key.as_str(), "failed to store rows");
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_from_array_of_objects() {
        let rows = rows_from_value(json!([{"Property": "Elm"}, {"Property": "Oak"}])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Property"], "Oak");
    }

    #[test]
    fn rows_reject_non_arrays_and_scalars() {
        assert!(rows_from_value(json!({"Property": "Elm"})).is_err());
        let err = rows_from_value(json!([{"a": 1}, 5])).unwrap_err();
        assert_eq!(err, "row 1 is not an object");
    }

    #[test]
    fn chunk_labels() {
        let mut c = ChunkInfo { first: true, ..ChunkInfo::default() };
        assert_eq!(c.label(), "first");
        c.last = true;
        assert_eq!(c.label(), "only");
        c.first = false;
        assert_eq!(c.label(), "last");
    }

    #[tokio::test]
    async fn unknown_dataset_is_reported_without_touching_the_database() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let ingestor = Ingestor::new(pool, &LeasingSection::default());

        let body = json!({"bogus": [], "units": "not rows"});
        let Value::Object(body) = body else { unreachable!() };
        let report = ingestor.apply_push(body, None).await;

        assert!(!report.success);
        let errors = report.errors.unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.dataset == "bogus"));
        assert!(errors.iter().any(|e| e.dataset == "units"));
    }
}
