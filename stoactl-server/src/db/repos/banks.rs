//! Bank repository and hold-limit exposure.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use stoactl_core::finance::{bank_exposure, BankExposure, ParticipationShare};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::core_entities::{BankPatch, NewBank};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Bank {
    pub bank_id: i32,
    pub bank_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub hold_limit: Option<Decimal>,
    pub per_deal_limit: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str =
    "bank_id, bank_name, city, TRIM(state) AS state, hold_limit, per_deal_limit, notes, created_at, updated_at";

pub struct BankRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> BankRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Bank>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM core.bank ORDER BY bank_name");
        Ok(sqlx::query_as::<_, Bank>(&sql).fetch_all(self.pool).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Bank, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM core.bank WHERE bank_id = $1");
        sqlx::query_as::<_, Bank>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found("bank", id)
    }

    pub async fn create(&self, b: NewBank) -> Result<Bank, DbError> {
        let sql = format!(
            "INSERT INTO core.bank (bank_name, city, state, hold_limit, per_deal_limit, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Bank>(&sql)
            .bind(b.bank_name)
            .bind(b.city)
            .bind(b.state)
            .bind(b.hold_limit)
            .bind(b.per_deal_limit)
            .bind(b.notes)
            .fetch_one(self.pool)
            .await?)
    }

    pub async fn update(&self, id: i32, b: BankPatch) -> Result<Bank, DbError> {
        let mut set = Assignments::new("core.bank");
        set.set_opt("bank_name", b.bank_name)
            .set_opt("city", b.city)
            .set_opt("state", b.state)
            .set_opt("hold_limit", b.hold_limit)
            .set_opt("per_deal_limit", b.per_deal_limit)
            .set_opt("notes", b.notes);
        let mut query = set.finish("bank_id", id, true, COLUMNS)?;
        query
            .build_query_as::<Bank>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("bank", id)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM core.bank WHERE bank_id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| DbError::from(e).on_delete())?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("bank", id));
        }
        Ok(())
    }

    /// Participations held by the bank against its hold limit.
    pub async fn exposure(&self, id: i32) -> Result<BankExposure, DbError> {
        let bank = self.get(id).await?;
        let rows: Vec<(i32, Decimal, bool)> = sqlx::query_as(
            r#"
            SELECT p.participation_id, p.exposure_amount, (p.paid_off OR NOT l.is_active)
            FROM banking.participation p
            JOIN banking.loan l ON l.loan_id = p.loan_id
            WHERE p.bank_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let shares: Vec<ParticipationShare> = rows
            .into_iter()
            .map(|(participation_id, exposure, paid_off)| ParticipationShare {
                participation_id,
                exposure,
                paid_off,
            })
            .collect();
        Ok(bank_exposure(bank.bank_id, bank.hold_limit, &shares))
    }
}
