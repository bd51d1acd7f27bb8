//! Liquidity requirement repository.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{LiquidityRequirementPatch, NewLiquidityRequirement};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct LiquidityRequirement {
    pub liquidity_requirement_id: i32,
    pub project_id: i32,
    pub loan_id: Option<i32>,
    pub total_amount: Option<Decimal>,
    pub lending_bank_amount: Option<Decimal>,
    pub notes: Option<String>,
}

const COLUMNS: &str =
    "liquidity_requirement_id, project_id, loan_id, total_amount, lending_bank_amount, notes";

pub struct LiquidityRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LiquidityRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        project_id: Option<i32>,
        loan_id: Option<i32>,
    ) -> Result<Vec<LiquidityRequirement>, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM banking.liquidity_requirement \
             WHERE ($1::int IS NULL OR project_id = $1) AND ($2::int IS NULL OR loan_id = $2) \
             ORDER BY liquidity_requirement_id"
        );
        Ok(sqlx::query_as::<_, LiquidityRequirement>(&sql)
            .bind(project_id)
            .bind(loan_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<LiquidityRequirement, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM banking.liquidity_requirement WHERE liquidity_requirement_id = $1"
        );
        sqlx::query_as::<_, LiquidityRequirement>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found("liquidity requirement", id)
    }

    pub async fn create(&self, l: NewLiquidityRequirement) -> Result<LiquidityRequirement, DbError> {
        let sql = format!(
            "INSERT INTO banking.liquidity_requirement \
                (project_id, loan_id, total_amount, lending_bank_amount, notes) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, LiquidityRequirement>(&sql)
            .bind(l.project_id)
            .bind(l.loan_id)
            .bind(l.total_amount)
            .bind(l.lending_bank_amount)
            .bind(l.notes)
            .fetch_one(self.pool)
            .await?)
    }

    pub async fn update(
        &self,
        id: i32,
        l: LiquidityRequirementPatch,
    ) -> Result<LiquidityRequirement, DbError> {
        let mut set = Assignments::new("banking.liquidity_requirement");
        set.set_opt("loan_id", l.loan_id)
            .set_opt("total_amount", l.total_amount)
            .set_opt("lending_bank_amount", l.lending_bank_amount)
            .set_opt("notes", l.notes);
        let mut query = set.finish("liquidity_requirement_id", id, false, COLUMNS)?;
        query
            .build_query_as::<LiquidityRequirement>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("liquidity requirement", id)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query(
            "DELETE FROM banking.liquidity_requirement WHERE liquidity_requirement_id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("liquidity requirement", id));
        }
        Ok(())
    }
}
