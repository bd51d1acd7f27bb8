//! Participation repository.
//!
//! `participation_percent` is derived: every write recomputes the shares of
//! all participations on the affected loan inside the same transaction.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use stoactl_core::finance::{participation_percents, ParticipationShare};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{NewParticipation, ParticipationPatch};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Participation {
    pub participation_id: i32,
    pub loan_id: i32,
    pub bank_id: i32,
    pub bank_name: Option<String>,
    pub exposure_amount: Decimal,
    pub participation_percent: Option<Decimal>,
    pub paid_off: bool,
    pub notes: Option<String>,
}

const SELECT: &str = r#"
    SELECT pa.participation_id, pa.loan_id, pa.bank_id, b.bank_name,
           pa.exposure_amount, pa.participation_percent, pa.paid_off, pa.notes
    FROM banking.participation pa
    LEFT JOIN core.bank b ON b.bank_id = pa.bank_id
"#;

#[derive(FromRow)]
struct ShareRow {
    participation_id: i32,
    exposure_amount: Decimal,
    paid_off: bool,
}

/// Rewrite `participation_percent` for every participation on `loan_id`.
pub(crate) async fn recompute_percents(conn: &mut PgConnection, loan_id: i32) -> Result<(), DbError> {
    let rows = sqlx::query_as::<_, ShareRow>(
        "SELECT participation_id, exposure_amount, paid_off FROM banking.participation \
         WHERE loan_id = $1 ORDER BY participation_id FOR UPDATE",
    )
    .bind(loan_id)
    .fetch_all(&mut *conn)
    .await?;

    let shares: Vec<ParticipationShare> = rows
        .iter()
        .map(|r| ParticipationShare {
            participation_id: r.participation_id,
            exposure: r.exposure_amount,
            paid_off: r.paid_off,
        })
        .collect();

    for (participation_id, percent) in participation_percents(&shares) {
        sqlx::query("UPDATE banking.participation SET participation_percent = $1 WHERE participation_id = $2")
            .bind(percent)
            .bind(participation_id)
            .execute(&mut *conn)
            .await?;
    }
    tracing::debug!(loan_id, participations = shares.len(), "participation percents recomputed");
    Ok(())
}

async fn fetch(conn: &mut PgConnection, id: i32) -> Result<Participation, DbError> {
    let sql = format!("{SELECT} WHERE pa.participation_id = $1");
    sqlx::query_as::<_, Participation>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .or_not_found("participation", id)
}

pub struct ParticipationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ParticipationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, loan_id: Option<i32>) -> Result<Vec<Participation>, DbError> {
        let sql = format!(
            "{SELECT} WHERE ($1::int IS NULL OR pa.loan_id = $1) ORDER BY pa.loan_id, pa.participation_id"
        );
        Ok(sqlx::query_as::<_, Participation>(&sql)
            .bind(loan_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<Participation, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn create(&self, p: NewParticipation) -> Result<Participation, DbError> {
        let mut tx = self.pool.begin().await?;
        let (id, loan_id): (i32, i32) = sqlx::query_as(
            r#"
            INSERT INTO banking.participation (loan_id, bank_id, exposure_amount, paid_off, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING participation_id, loan_id
            "#,
        )
        .bind(p.loan_id)
        .bind(p.bank_id)
        .bind(p.exposure_amount.unwrap_or_default())
        .bind(p.paid_off.unwrap_or(false))
        .bind(p.notes)
        .fetch_one(&mut *tx)
        .await?;

        recompute_percents(&mut tx, loan_id).await?;
        let created = fetch(&mut tx, id).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn update(&self, id: i32, p: ParticipationPatch) -> Result<Participation, DbError> {
        let mut set = Assignments::new("banking.participation");
        set.set_opt("bank_id", p.bank_id)
            .set_opt("exposure_amount", p.exposure_amount)
            .set_opt("paid_off", p.paid_off)
            .set_opt("notes", p.notes);
        let mut query = set.finish("participation_id", id, false, "loan_id")?;

        let mut tx = self.pool.begin().await?;
        let loan_id = query
            .build_query_scalar::<i32>()
            .fetch_optional(&mut *tx)
            .await?
            .or_not_found("participation", id)?;
        recompute_percents(&mut tx, loan_id).await?;
        let updated = fetch(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        let loan_id: i32 = sqlx::query_scalar(
            "DELETE FROM banking.participation WHERE participation_id = $1 RETURNING loan_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).on_delete())?
        .or_not_found("participation", id)?;
        recompute_percents(&mut tx, loan_id).await?;
        tx.commit().await?;
        Ok(())
    }
}
