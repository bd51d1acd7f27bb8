//! Key/value application settings.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::{DbError, OrNotFound};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Setting {
    pub setting_key: String,
    pub setting_value: Option<String>,
    pub updated_at: DateTime<Utc>,
}

pub struct SettingsRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Setting>, DbError> {
        Ok(sqlx::query_as::<_, Setting>(
            "SELECT setting_key, setting_value, updated_at FROM banking.app_settings ORDER BY setting_key",
        )
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn get(&self, key: &str) -> Result<Setting, DbError> {
        sqlx::query_as::<_, Setting>(
            "SELECT setting_key, setting_value, updated_at FROM banking.app_settings WHERE setting_key = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?
        .or_not_found("setting", key)
    }

    pub async fn upsert(&self, key: &str, value: Option<String>) -> Result<Setting, DbError> {
        Ok(sqlx::query_as::<_, Setting>(
            r#"
            INSERT INTO banking.app_settings (setting_key, setting_value)
            VALUES ($1, $2)
            ON CONFLICT (setting_key) DO UPDATE
            SET setting_value = EXCLUDED.setting_value, updated_at = NOW()
            RETURNING setting_key, setting_value, updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(self.pool)
        .await?)
    }
}
