//! Leasing dataset tables, the sync log and the dashboard snapshot row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use stoactl_core::leasing::{Dashboard, DatasetKey, RawRow, RowView};

use crate::db::DbError;
use crate::models::{Paginated, Pagination};

/// Where a sync's rows came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSource {
    Push,
    Domo,
}

impl SyncSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Domo => "domo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    Skipped,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct SyncLogEntry {
    pub sync_log_id: i64,
    pub dataset: String,
    pub row_count: i32,
    pub data_hash: Option<String>,
    pub source: String,
    pub status: String,
    pub message: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// A log line about to be written
#[derive(Debug, Clone)]
pub struct NewSyncLog<'a> {
    pub dataset: DatasetKey,
    pub row_count: usize,
    pub data_hash: Option<&'a str>,
    pub source: SyncSource,
    pub status: SyncStatus,
    pub message: Option<&'a str>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StoredSnapshot {
    pub payload: Json<Dashboard>,
    pub etag: String,
    pub built_at: DateTime<Utc>,
}

const LOG_COLUMNS: &str =
    "sync_log_id, dataset, row_count, data_hash, source, status, message, synced_at";

/// Empty a dataset table.
pub(crate) async fn truncate(conn: &mut PgConnection, key: DatasetKey) -> Result<(), DbError> {
    sqlx::query(&format!("TRUNCATE TABLE {}", key.table()))
        .execute(conn)
        .await?;
    Ok(())
}

/// Append rows, deriving the `property` column from each row.
pub(crate) async fn insert_rows(
    conn: &mut PgConnection,
    key: DatasetKey,
    rows: &[RawRow],
) -> Result<u64, DbError> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("INSERT INTO {} (property, payload) ", key.table()));
    builder.push_values(rows, |mut b, row| {
        b.push_bind(RowView::new(row).property())
            .push_bind(Json(row));
    });
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn record_sync(conn: &mut PgConnection, entry: &NewSyncLog<'_>) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO leasing.sync_log (dataset, row_count, data_hash, source, status, message) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry.dataset.as_str())
    .bind(i32::try_from(entry.row_count).unwrap_or(i32::MAX))
    .bind(entry.data_hash)
    .bind(entry.source.as_str())
    .bind(entry.status.as_str())
    .bind(entry.message)
    .execute(conn)
    .await?;
    Ok(())
}

pub struct LeasingRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LeasingRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn record_sync(&self, entry: &NewSyncLog<'_>) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        record_sync(&mut conn, entry).await
    }

    /// Most recent successful sync of `key`.
    pub async fn last_success(&self, key: DatasetKey) -> Result<Option<SyncLogEntry>, DbError> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM leasing.sync_log \
             WHERE dataset = $1 AND status = 'synced' ORDER BY synced_at DESC, sync_log_id DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, SyncLogEntry>(&sql)
            .bind(key.as_str())
            .fetch_optional(self.pool)
            .await?)
    }

    /// Latest log entry of every dataset that has one.
    pub async fn latest_per_dataset(&self) -> Result<Vec<SyncLogEntry>, DbError> {
        let sql = format!(
            "SELECT DISTINCT ON (dataset) {LOG_COLUMNS} FROM leasing.sync_log \
             ORDER BY dataset, synced_at DESC, sync_log_id DESC"
        );
        Ok(sqlx::query_as::<_, SyncLogEntry>(&sql).fetch_all(self.pool).await?)
    }

    /// Stored rows of one dataset, optionally narrowed to a property.
    pub async fn rows(
        &self,
        key: DatasetKey,
        property: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Value>, DbError> {
        let table = key.table();
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {table} WHERE ($1::text IS NULL OR property ILIKE $1)"
        ))
        .bind(property)
        .fetch_one(self.pool)
        .await?;

        let items: Vec<Json<Value>> = sqlx::query_scalar(&format!(
            "SELECT payload FROM {table} WHERE ($1::text IS NULL OR property ILIKE $1) \
             ORDER BY id LIMIT $2 OFFSET $3"
        ))
        .bind(property)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Paginated {
            items: items.into_iter().map(|Json(v)| v).collect(),
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    /// Every stored row of one dataset, in insertion order.
    pub async fn all_rows(&self, key: DatasetKey) -> Result<Vec<RawRow>, DbError> {
        let rows: Vec<Json<RawRow>> =
            sqlx::query_scalar(&format!("SELECT payload FROM {} ORDER BY id", key.table()))
                .fetch_all(self.pool)
                .await?;
        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }

    pub async fn load_snapshot(&self) -> Result<Option<StoredSnapshot>, DbError> {
        Ok(sqlx::query_as::<_, StoredSnapshot>(
            "SELECT payload, etag, built_at FROM leasing.dashboard_snapshot WHERE snapshot_id = 1",
        )
        .fetch_optional(self.pool)
        .await?)
    }

    pub async fn save_snapshot(&self, dashboard: &Dashboard, etag: &str) -> Result<DateTime<Utc>, DbError> {
        Ok(sqlx::query_scalar(
            r#"
            INSERT INTO leasing.dashboard_snapshot (snapshot_id, payload, etag, built_at)
            VALUES (1, $1, $2, NOW())
            ON CONFLICT (snapshot_id) DO UPDATE
            SET payload = EXCLUDED.payload, etag = EXCLUDED.etag, built_at = EXCLUDED.built_at
            RETURNING built_at
            "#,
        )
        .bind(Json(dashboard))
        .bind(etag)
        .fetch_one(self.pool)
        .await?)
    }
}
