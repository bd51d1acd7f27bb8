//! Metadata rows for uploaded banking files; the bytes live in a
//! [`FileStore`](crate::storage::FileStore).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::{DbError, OrNotFound};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct BankingFile {
    pub banking_file_id: i32,
    pub project_id: i32,
    pub file_name: String,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub storage_key: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

const COLUMNS: &str =
    "banking_file_id, project_id, file_name, content_type, storage_key, size_bytes, uploaded_at";

pub struct FileRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FileRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, project_id: i32) -> Result<Vec<BankingFile>, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM banking.banking_file WHERE project_id = $1 ORDER BY uploaded_at DESC"
        );
        Ok(sqlx::query_as::<_, BankingFile>(&sql)
            .bind(project_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<BankingFile, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM banking.banking_file WHERE banking_file_id = $1");
        sqlx::query_as::<_, BankingFile>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found("file", id)
    }

    pub async fn create(
        &self,
        project_id: i32,
        file_name: &str,
        content_type: Option<&str>,
        storage_key: &str,
        size_bytes: i64,
    ) -> Result<BankingFile, DbError> {
        let sql = format!(
            "INSERT INTO banking.banking_file (project_id, file_name, content_type, storage_key, size_bytes) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, BankingFile>(&sql)
            .bind(project_id)
            .bind(file_name)
            .bind(content_type)
            .bind(storage_key)
            .bind(size_bytes)
            .fetch_one(self.pool)
            .await?)
    }

    /// Remove the row and hand back its storage key.
    pub async fn delete(&self, id: i32) -> Result<String, DbError> {
        sqlx::query_scalar::<_, String>(
            "DELETE FROM banking.banking_file WHERE banking_file_id = $1 RETURNING storage_key",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .or_not_found("file", id)
    }
}
