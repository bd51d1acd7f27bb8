//! Personal guarantees and their burndown schedules.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use stoactl_core::finance::guarantee_amount;

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{BurndownPatch, GuaranteePatch, NewBurndown, NewGuarantee};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Guarantee {
    pub guarantee_id: i32,
    pub project_id: i32,
    pub loan_id: Option<i32>,
    pub person_id: i32,
    pub guarantor_name: Option<String>,
    pub guarantee_percent: Option<Decimal>,
    pub guarantee_amount: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Burndown {
    pub burndown_id: i32,
    pub guarantee_id: i32,
    pub burndown_date: NaiveDate,
    pub remaining_percent: Option<Decimal>,
    pub remaining_amount: Option<Decimal>,
    pub notes: Option<String>,
}

const SELECT: &str = r#"
    SELECT g.guarantee_id, g.project_id, g.loan_id, g.person_id, pe.full_name AS guarantor_name,
           g.guarantee_percent, g.guarantee_amount, g.notes
    FROM banking.guarantee g
    LEFT JOIN core.person pe ON pe.person_id = g.person_id
"#;

const BURNDOWN_COLUMNS: &str =
    "burndown_id, guarantee_id, burndown_date, remaining_percent, remaining_amount, notes";

/// Dollar amount implied by the loan amount and the guarantee percent.
async fn derived_amount(
    conn: &mut PgConnection,
    loan_id: Option<i32>,
    percent: Option<Decimal>,
) -> Result<Option<Decimal>, DbError> {
    let (Some(loan_id), Some(percent)) = (loan_id, percent) else {
        return Ok(None);
    };
    let loan_amount: Option<Option<Decimal>> =
        sqlx::query_scalar("SELECT loan_amount FROM banking.loan WHERE loan_id = $1")
            .bind(loan_id)
            .fetch_optional(conn)
            .await?;
    Ok(loan_amount.flatten().map(|amount| guarantee_amount(amount, percent)))
}

async fn fetch(conn: &mut PgConnection, id: i32) -> Result<Guarantee, DbError> {
    let sql = format!("{SELECT} WHERE g.guarantee_id = $1");
    sqlx::query_as::<_, Guarantee>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .or_not_found("guarantee", id)
}

pub struct GuaranteeRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GuaranteeRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        project_id: Option<i32>,
        loan_id: Option<i32>,
    ) -> Result<Vec<Guarantee>, DbError> {
        let sql = format!(
            "{SELECT} WHERE ($1::int IS NULL OR g.project_id = $1) \
             AND ($2::int IS NULL OR g.loan_id = $2) ORDER BY g.guarantee_id"
        );
        Ok(sqlx::query_as::<_, Guarantee>(&sql)
            .bind(project_id)
            .bind(loan_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<Guarantee, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn create(&self, g: NewGuarantee) -> Result<Guarantee, DbError> {
        let mut tx = self.pool.begin().await?;
        let amount = match g.guarantee_amount {
            Some(amount) => Some(amount),
            None => derived_amount(&mut tx, g.loan_id, g.guarantee_percent).await?,
        };
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO banking.guarantee
                (project_id, loan_id, person_id, guarantee_percent, guarantee_amount, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING guarantee_id
            "#,
        )
        .bind(g.project_id)
        .bind(g.loan_id)
        .bind(g.person_id)
        .bind(g.guarantee_percent)
        .bind(amount)
        .bind(g.notes)
        .fetch_one(&mut *tx)
        .await?;
        let created = fetch(&mut tx, id).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn update(&self, id: i32, g: GuaranteePatch) -> Result<Guarantee, DbError> {
        let rederive = g.guarantee_amount.is_none()
            && (g.guarantee_percent.is_some() || g.loan_id.is_some());

        let mut set = Assignments::new("banking.guarantee");
        set.set_opt("loan_id", g.loan_id)
            .set_opt("person_id", g.person_id)
            .set_opt("guarantee_percent", g.guarantee_percent)
            .set_opt("guarantee_amount", g.guarantee_amount)
            .set_opt("notes", g.notes);
        let mut query = set.finish("guarantee_id", id, false, "guarantee_id")?;

        let mut tx = self.pool.begin().await?;
        query
            .build_query_scalar::<i32>()
            .fetch_optional(&mut *tx)
            .await?
            .or_not_found("guarantee", id)?;

        let mut updated = fetch(&mut tx, id).await?;
        if rederive {
            let amount = derived_amount(&mut tx, updated.loan_id, updated.guarantee_percent).await?;
            if amount.is_some() {
                sqlx::query("UPDATE banking.guarantee SET guarantee_amount = $1 WHERE guarantee_id = $2")
                    .bind(amount)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                updated.guarantee_amount = amount;
            }
        }
        tx.commit().await?;
        Ok(updated)
    }

    /// Delete the guarantee together with its burndown rows.
    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM banking.guarantee_burndown WHERE guarantee_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM banking.guarantee WHERE guarantee_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).on_delete())?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("guarantee", id));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn burndowns(&self, guarantee_id: i32) -> Result<Vec<Burndown>, DbError> {
        self.ensure_exists(guarantee_id).await?;
        let sql = format!(
            "SELECT {BURNDOWN_COLUMNS} FROM banking.guarantee_burndown \
             WHERE guarantee_id = $1 ORDER BY burndown_date"
        );
        Ok(sqlx::query_as::<_, Burndown>(&sql)
            .bind(guarantee_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn create_burndown(&self, guarantee_id: i32, b: NewBurndown) -> Result<Burndown, DbError> {
        self.ensure_exists(guarantee_id).await?;
        let sql = format!(
            "INSERT INTO banking.guarantee_burndown \
                (guarantee_id, burndown_date, remaining_percent, remaining_amount, notes) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {BURNDOWN_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Burndown>(&sql)
            .bind(guarantee_id)
            .bind(b.burndown_date)
            .bind(b.remaining_percent)
            .bind(b.remaining_amount)
            .bind(b.notes)
            .fetch_one(self.pool)
            .await?)
    }

    pub async fn update_burndown(&self, id: i32, b: BurndownPatch) -> Result<Burndown, DbError> {
        let mut set = Assignments::new("banking.guarantee_burndown");
        set.set_opt("burndown_date", b.burndown_date)
            .set_opt("remaining_percent", b.remaining_percent)
            .set_opt("remaining_amount", b.remaining_amount)
            .set_opt("notes", b.notes);
        let mut query = set.finish("burndown_id", id, false, BURNDOWN_COLUMNS)?;
        query
            .build_query_as::<Burndown>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("guarantee burndown", id)
    }

    pub async fn delete_burndown(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM banking.guarantee_burndown WHERE burndown_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("guarantee burndown", id));
        }
        Ok(())
    }

    async fn ensure_exists(&self, id: i32) -> Result<(), DbError> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT guarantee_id FROM banking.guarantee WHERE guarantee_id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        found.map(|_| ()).or_not_found("guarantee", id)
    }
}
