//! Prospective-lender tracking, one row per bank.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{BankTargetPatch, NewBankTarget};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct BankTarget {
    pub bank_target_id: i32,
    pub bank_id: i32,
    pub bank_name: Option<String>,
    pub assets: Option<String>,
    pub contact_name: Option<String>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT: &str = r#"
    SELECT t.bank_target_id, t.bank_id, b.bank_name, t.assets, t.contact_name, t.comments,
           t.created_at, t.updated_at
    FROM banking.bank_target t
    LEFT JOIN core.bank b ON b.bank_id = t.bank_id
"#;

pub struct BankTargetRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> BankTargetRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<BankTarget>, DbError> {
        let sql = format!("{SELECT} ORDER BY b.bank_name");
        Ok(sqlx::query_as::<_, BankTarget>(&sql).fetch_all(self.pool).await?)
    }

    pub async fn get(&self, id: i32) -> Result<BankTarget, DbError> {
        let sql = format!("{SELECT} WHERE t.bank_target_id = $1");
        sqlx::query_as::<_, BankTarget>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found("bank target", id)
    }

    pub async fn create(&self, t: NewBankTarget) -> Result<BankTarget, DbError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO banking.bank_target (bank_id, assets, contact_name, comments) \
             VALUES ($1, $2, $3, $4) RETURNING bank_target_id",
        )
        .bind(t.bank_id)
        .bind(t.assets)
        .bind(t.contact_name)
        .bind(t.comments)
        .fetch_one(self.pool)
        .await?;
        self.get(id).await
    }

    pub async fn update(&self, id: i32, t: BankTargetPatch) -> Result<BankTarget, DbError> {
        let mut set = Assignments::new("banking.bank_target");
        set.set_opt("assets", t.assets)
            .set_opt("contact_name", t.contact_name)
            .set_opt("comments", t.comments);
        let mut query = set.finish("bank_target_id", id, true, "bank_target_id")?;
        query
            .build_query_scalar::<i32>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("bank target", id)?;
        self.get(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM banking.bank_target WHERE bank_target_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("bank target", id));
        }
        Ok(())
    }
}
