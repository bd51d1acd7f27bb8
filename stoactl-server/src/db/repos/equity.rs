//! Equity commitments, their related parties and the project capital stack.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use stoactl_core::finance::{capital_stack, CapitalStack, DebtLine, EquityLine};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{EquityCommitmentPatch, NewEquityCommitment};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct EquityCommitment {
    pub equity_commitment_id: i32,
    pub project_id: i32,
    pub equity_partner_id: Option<i32>,
    pub partner_name: Option<String>,
    pub equity_type: Option<String>,
    pub amount: Option<Decimal>,
    pub funding_date: Option<NaiveDate>,
    pub interest_rate: Option<Decimal>,
    pub notes: Option<String>,
    pub related_party_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct RelatedParty {
    pub equity_commitment_id: i32,
    pub related_party_id: i32,
    pub partner_name: Option<String>,
}

const SELECT: &str = r#"
    SELECT ec.equity_commitment_id, ec.project_id, ec.equity_partner_id, ep.partner_name,
           ec.equity_type, ec.amount, ec.funding_date, ec.interest_rate, ec.notes,
           ARRAY(
               SELECT rp.related_party_id FROM banking.equity_commitment_related_party rp
               WHERE rp.equity_commitment_id = ec.equity_commitment_id
               ORDER BY rp.related_party_id
           ) AS related_party_ids
    FROM banking.equity_commitment ec
    LEFT JOIN core.equity_partner ep ON ep.equity_partner_id = ec.equity_partner_id
"#;

async fn fetch(conn: &mut PgConnection, id: i32) -> Result<EquityCommitment, DbError> {
    let sql = format!("{SELECT} WHERE ec.equity_commitment_id = $1");
    sqlx::query_as::<_, EquityCommitment>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .or_not_found("equity commitment", id)
}

#[derive(FromRow)]
struct DebtRow {
    loan_id: i32,
    loan_amount: Option<Decimal>,
    is_active: bool,
}

#[derive(FromRow)]
struct EquityRow {
    equity_commitment_id: i32,
    equity_type: Option<String>,
    amount: Option<Decimal>,
}

pub struct EquityRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EquityRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, project_id: Option<i32>) -> Result<Vec<EquityCommitment>, DbError> {
        let sql = format!(
            "{SELECT} WHERE ($1::int IS NULL OR ec.project_id = $1) \
             ORDER BY ec.project_id, ec.equity_commitment_id"
        );
        Ok(sqlx::query_as::<_, EquityCommitment>(&sql)
            .bind(project_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<EquityCommitment, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn create(&self, e: NewEquityCommitment) -> Result<EquityCommitment, DbError> {
        let mut tx = self.pool.begin().await?;
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO banking.equity_commitment
                (project_id, equity_partner_id, equity_type, amount, funding_date, interest_rate, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING equity_commitment_id
            "#,
        )
        .bind(e.project_id)
        .bind(e.equity_partner_id)
        .bind(e.equity_type)
        .bind(e.amount)
        .bind(e.funding_date)
        .bind(e.interest_rate)
        .bind(e.notes)
        .fetch_one(&mut *tx)
        .await?;

        for party in &e.related_party_ids {
            sqlx::query(
                "INSERT INTO banking.equity_commitment_related_party (equity_commitment_id, related_party_id) \
                 VALUES ($1, $2)",
            )
            .bind(id)
            .bind(party)
            .execute(&mut *tx)
            .await?;
        }

        let created = fetch(&mut tx, id).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn update(&self, id: i32, e: EquityCommitmentPatch) -> Result<EquityCommitment, DbError> {
        let mut set = Assignments::new("banking.equity_commitment");
        set.set_opt("equity_partner_id", e.equity_partner_id)
            .set_opt("equity_type", e.equity_type)
            .set_opt("amount", e.amount)
            .set_opt("funding_date", e.funding_date)
            .set_opt("interest_rate", e.interest_rate)
            .set_opt("notes", e.notes);
        let mut query = set.finish("equity_commitment_id", id, false, "equity_commitment_id")?;
        query
            .build_query_scalar::<i32>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("equity commitment", id)?;
        self.get(id).await
    }

    /// Delete the commitment and its related-party links.
    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM banking.equity_commitment_related_party WHERE equity_commitment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM banking.equity_commitment WHERE equity_commitment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).on_delete())?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("equity commitment", id));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn related_parties(&self, commitment_id: i32) -> Result<Vec<RelatedParty>, DbError> {
        self.get(commitment_id).await?;
        Ok(sqlx::query_as::<_, RelatedParty>(
            r#"
            SELECT rp.equity_commitment_id, rp.related_party_id, ep.partner_name
            FROM banking.equity_commitment_related_party rp
            LEFT JOIN core.equity_partner ep ON ep.equity_partner_id = rp.related_party_id
            WHERE rp.equity_commitment_id = $1
            ORDER BY ep.partner_name
            "#,
        )
        .bind(commitment_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Link a partner to the commitment; linking twice is a no-op.
    pub async fn add_related_party(
        &self,
        commitment_id: i32,
        party_id: i32,
    ) -> Result<Vec<RelatedParty>, DbError> {
        self.get(commitment_id).await?;
        sqlx::query(
            "INSERT INTO banking.equity_commitment_related_party (equity_commitment_id, related_party_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(commitment_id)
        .bind(party_id)
        .execute(self.pool)
        .await?;
        self.related_parties(commitment_id).await
    }

    pub async fn remove_related_party(&self, commitment_id: i32, party_id: i32) -> Result<(), DbError> {
        let result = sqlx::query(
            "DELETE FROM banking.equity_commitment_related_party \
             WHERE equity_commitment_id = $1 AND related_party_id = $2",
        )
        .bind(commitment_id)
        .bind(party_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "related party",
                format!("{commitment_id}/{party_id}"),
            ));
        }
        Ok(())
    }

    /// Active debt against committed equity for one project.
    pub async fn capital_stack(&self, project_id: i32) -> Result<CapitalStack, DbError> {
        let exists: Option<i32> =
            sqlx::query_scalar("SELECT project_id FROM core.project WHERE project_id = $1")
                .bind(project_id)
                .fetch_optional(self.pool)
                .await?;
        exists.or_not_found("project", project_id)?;

        let debt = sqlx::query_as::<_, DebtRow>(
            "SELECT loan_id, loan_amount, is_active FROM banking.loan WHERE project_id = $1 ORDER BY loan_id",
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;
        let equity = sqlx::query_as::<_, EquityRow>(
            "SELECT equity_commitment_id, equity_type, amount FROM banking.equity_commitment \
             WHERE project_id = $1 ORDER BY equity_commitment_id",
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        let debt: Vec<DebtLine> = debt
            .into_iter()
            .map(|d| DebtLine {
                loan_id: d.loan_id,
                amount: d.loan_amount.unwrap_or_default(),
                is_active: d.is_active,
            })
            .collect();
        let equity: Vec<EquityLine> = equity
            .into_iter()
            .map(|e| EquityLine {
                equity_commitment_id: e.equity_commitment_id,
                equity_type: e.equity_type,
                amount: e.amount.unwrap_or_default(),
            })
            .collect();
        Ok(capital_stack(project_id, &debt, &equity))
    }
}
