//! Loan repository.
//!
//! Writes run in a transaction with the DSCR/Occupancy covenant sync so a
//! loan and its auto-maintained covenants never disagree.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};

use super::covenants::{sync_loan_covenants, LoanCovenantTerms};
use super::{delete_step, CascadeReport};
use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{check_loan_terms, LoanPatch, NewLoan};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Loan {
    pub loan_id: i32,
    pub project_id: i32,
    pub project_name: Option<String>,
    pub loan_type_id: Option<i32>,
    pub loan_type_name: Option<String>,
    pub lender_id: Option<i32>,
    pub lender_name: Option<String>,
    pub financing_type: Option<String>,
    pub loan_amount: Option<Decimal>,
    pub loan_closing_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub fixed_or_floating: Option<String>,
    pub index_name: Option<String>,
    pub spread: Option<Decimal>,
    pub interest_rate: Option<Decimal>,
    pub is_active: bool,
    pub dscr_requirement: Option<Decimal>,
    pub dscr_test_date: Option<NaiveDate>,
    pub occupancy_requirement: Option<Decimal>,
    pub occupancy_test_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    fn covenant_terms(&self) -> LoanCovenantTerms {
        LoanCovenantTerms {
            loan_id: self.loan_id,
            project_id: self.project_id,
            dscr_requirement: self.dscr_requirement,
            dscr_test_date: self.dscr_test_date,
            occupancy_requirement: self.occupancy_requirement,
            occupancy_test_date: self.occupancy_test_date,
        }
    }
}

const SELECT: &str = r#"
    SELECT l.loan_id, l.project_id, p.project_name,
           l.loan_type_id, lt.name AS loan_type_name,
           l.lender_id, b.bank_name AS lender_name,
           l.financing_type, l.loan_amount, l.loan_closing_date, l.maturity_date,
           l.fixed_or_floating, l.index_name, l.spread, l.interest_rate, l.is_active,
           l.dscr_requirement, l.dscr_test_date, l.occupancy_requirement, l.occupancy_test_date,
           l.notes, l.created_at, l.updated_at
    FROM banking.loan l
    LEFT JOIN core.project p ON p.project_id = l.project_id
    LEFT JOIN banking.loan_type lt ON lt.loan_type_id = l.loan_type_id
    LEFT JOIN core.bank b ON b.bank_id = l.lender_id
"#;

async fn fetch(conn: &mut PgConnection, id: i32) -> Result<Loan, DbError> {
    let sql = format!("{SELECT} WHERE l.loan_id = $1");
    sqlx::query_as::<_, Loan>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .or_not_found("loan", id)
}

pub struct LoanRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LoanRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, project_id: Option<i32>) -> Result<Vec<Loan>, DbError> {
        let sql = format!(
            "{SELECT} WHERE ($1::int IS NULL OR l.project_id = $1) ORDER BY p.project_name, l.loan_id"
        );
        Ok(sqlx::query_as::<_, Loan>(&sql)
            .bind(project_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<Loan, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn create(&self, l: NewLoan) -> Result<Loan, DbError> {
        let mut tx = self.pool.begin().await?;
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO banking.loan
                (project_id, loan_type_id, lender_id, financing_type, loan_amount,
                 loan_closing_date, maturity_date, fixed_or_floating, index_name, spread,
                 interest_rate, is_active, dscr_requirement, dscr_test_date,
                 occupancy_requirement, occupancy_test_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING loan_id
            "#,
        )
        .bind(l.project_id)
        .bind(l.loan_type_id)
        .bind(l.lender_id)
        .bind(l.financing_type)
        .bind(l.loan_amount)
        .bind(l.loan_closing_date)
        .bind(l.maturity_date)
        .bind(l.fixed_or_floating)
        .bind(l.index_name)
        .bind(l.spread)
        .bind(l.interest_rate)
        .bind(l.is_active.unwrap_or(true))
        .bind(l.dscr_requirement)
        .bind(l.dscr_test_date)
        .bind(l.occupancy_requirement)
        .bind(l.occupancy_test_date)
        .bind(l.notes)
        .fetch_one(&mut *tx)
        .await?;

        let loan = fetch(&mut tx, id).await?;
        sync_loan_covenants(&mut tx, &loan.covenant_terms()).await?;
        tx.commit().await?;
        Ok(loan)
    }

    pub async fn update(&self, id: i32, l: LoanPatch) -> Result<Loan, DbError> {
        let mut set = Assignments::new("banking.loan");
        set.set_opt("project_id", l.project_id)
            .set_opt("loan_type_id", l.loan_type_id)
            .set_opt("lender_id", l.lender_id)
            .set_opt("financing_type", l.financing_type)
            .set_opt("loan_amount", l.loan_amount)
            .set_opt("loan_closing_date", l.loan_closing_date)
            .set_opt("maturity_date", l.maturity_date)
            .set_opt("fixed_or_floating", l.fixed_or_floating)
            .set_opt("index_name", l.index_name)
            .set_opt("spread", l.spread)
            .set_opt("interest_rate", l.interest_rate)
            .set_opt("is_active", l.is_active)
            .set_opt("dscr_requirement", l.dscr_requirement)
            .set_opt("dscr_test_date", l.dscr_test_date)
            .set_opt("occupancy_requirement", l.occupancy_requirement)
            .set_opt("occupancy_test_date", l.occupancy_test_date)
            .set_opt("notes", l.notes);
        let mut query = set.finish("loan_id", id, true, "loan_id")?;

        let mut tx = self.pool.begin().await?;
        query
            .build_query_scalar::<i32>()
            .fetch_optional(&mut *tx)
            .await?
            .or_not_found("loan", id)?;
        let loan = fetch(&mut tx, id).await?;
        // Merged row must still satisfy the cross-field rules; dropping tx rolls back.
        check_loan_terms(
            loan.fixed_or_floating.as_deref(),
            loan.index_name.as_deref(),
            loan.loan_closing_date,
            loan.maturity_date,
        )?;
        sync_loan_covenants(&mut tx, &loan.covenant_terms()).await?;
        tx.commit().await?;
        Ok(loan)
    }

    /// Delete the loan and its children, in one transaction.
    pub async fn delete_cascade(&self, id: i32) -> Result<CascadeReport, DbError> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i32> =
            sqlx::query_scalar("SELECT loan_id FROM banking.loan WHERE loan_id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        exists.or_not_found("loan", id)?;

        let mut report = CascadeReport::default();
        let steps: [(&'static str, &str); 9] = [
            (
                "banking.guarantee_burndown",
                "DELETE FROM banking.guarantee_burndown WHERE guarantee_id IN \
                 (SELECT guarantee_id FROM banking.guarantee WHERE loan_id = $1)",
            ),
            ("banking.guarantee", "DELETE FROM banking.guarantee WHERE loan_id = $1"),
            ("banking.covenant", "DELETE FROM banking.covenant WHERE loan_id = $1"),
            ("banking.dscr_test", "DELETE FROM banking.dscr_test WHERE loan_id = $1"),
            (
                "banking.liquidity_requirement",
                "DELETE FROM banking.liquidity_requirement WHERE loan_id = $1",
            ),
            ("banking.participation", "DELETE FROM banking.participation WHERE loan_id = $1"),
            ("banking.loan_proceeds", "DELETE FROM banking.loan_proceeds WHERE loan_id = $1"),
            (
                "banking.loan_modification",
                "DELETE FROM banking.loan_modification WHERE loan_id = $1",
            ),
            ("banking.loan", "DELETE FROM banking.loan WHERE loan_id = $1"),
        ];
        for (table, sql) in steps {
            delete_step(&mut tx, &mut report, table, sql, id).await?;
        }

        tx.commit().await?;
        tracing::info!(loan_id = id, rows = report.total(), "loan deleted with dependents");
        Ok(report)
    }
}
