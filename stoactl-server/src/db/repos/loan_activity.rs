//! Loan proceeds (draws) and loan modifications.
//!
//! Both carry `project_id` redundantly; when a request omits it the loan's
//! project is used.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{
    LoanModificationPatch, LoanProceedsPatch, NewLoanModification, NewLoanProceeds,
};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct LoanProceeds {
    pub loan_proceeds_id: i32,
    pub loan_id: i32,
    pub project_id: i32,
    pub proceeds_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub draw_number: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct LoanModification {
    pub loan_modification_id: i32,
    pub loan_id: i32,
    pub project_id: i32,
    pub modification_type: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub description: Option<String>,
}

const PROCEEDS_COLUMNS: &str =
    "loan_proceeds_id, loan_id, project_id, proceeds_date, amount, draw_number, notes";
const MODIFICATION_COLUMNS: &str =
    "loan_modification_id, loan_id, project_id, modification_type, effective_date, description";

pub struct LoanActivityRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LoanActivityRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// `project_id` as given, else the loan's project.
    async fn resolve_project(&self, loan_id: i32, project_id: Option<i32>) -> Result<i32, DbError> {
        if let Some(id) = project_id {
            return Ok(id);
        }
        let project: Option<i32> =
            sqlx::query_scalar("SELECT project_id FROM banking.loan WHERE loan_id = $1")
                .bind(loan_id)
                .fetch_optional(self.pool)
                .await?;
        project.ok_or_else(|| DbError::MissingReference {
            constraint: format!("loan {loan_id}"),
        })
    }

    pub async fn list_proceeds(&self, loan_id: Option<i32>) -> Result<Vec<LoanProceeds>, DbError> {
        let sql = format!(
            "SELECT {PROCEEDS_COLUMNS} FROM banking.loan_proceeds \
             WHERE ($1::int IS NULL OR loan_id = $1) \
             ORDER BY loan_id, proceeds_date NULLS LAST, draw_number NULLS LAST"
        );
        Ok(sqlx::query_as::<_, LoanProceeds>(&sql)
            .bind(loan_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn create_proceeds(&self, p: NewLoanProceeds) -> Result<LoanProceeds, DbError> {
        let loan_id = p.loan_id.unwrap_or_default();
        let project_id = self.resolve_project(loan_id, p.project_id).await?;
        let sql = format!(
            "INSERT INTO banking.loan_proceeds \
                (loan_id, project_id, proceeds_date, amount, draw_number, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PROCEEDS_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, LoanProceeds>(&sql)
            .bind(loan_id)
            .bind(project_id)
            .bind(p.proceeds_date)
            .bind(p.amount)
            .bind(p.draw_number)
            .bind(p.notes)
            .fetch_one(self.pool)
            .await?)
    }

    pub async fn update_proceeds(&self, id: i32, p: LoanProceedsPatch) -> Result<LoanProceeds, DbError> {
        let mut set = Assignments::new("banking.loan_proceeds");
        set.set_opt("proceeds_date", p.proceeds_date)
            .set_opt("amount", p.amount)
            .set_opt("draw_number", p.draw_number)
            .set_opt("notes", p.notes);
        let mut query = set.finish("loan_proceeds_id", id, false, PROCEEDS_COLUMNS)?;
        query
            .build_query_as::<LoanProceeds>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("loan proceeds", id)
    }

    pub async fn delete_proceeds(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM banking.loan_proceeds WHERE loan_proceeds_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("loan proceeds", id));
        }
        Ok(())
    }

    pub async fn list_modifications(&self, loan_id: Option<i32>) -> Result<Vec<LoanModification>, DbError> {
        let sql = format!(
            "SELECT {MODIFICATION_COLUMNS} FROM banking.loan_modification \
             WHERE ($1::int IS NULL OR loan_id = $1) \
             ORDER BY loan_id, effective_date NULLS LAST"
        );
        Ok(sqlx::query_as::<_, LoanModification>(&sql)
            .bind(loan_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn create_modification(&self, m: NewLoanModification) -> Result<LoanModification, DbError> {
        let loan_id = m.loan_id.unwrap_or_default();
        let project_id = self.resolve_project(loan_id, m.project_id).await?;
        let sql = format!(
            "INSERT INTO banking.loan_modification \
                (loan_id, project_id, modification_type, effective_date, description) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {MODIFICATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, LoanModification>(&sql)
            .bind(loan_id)
            .bind(project_id)
            .bind(m.modification_type)
            .bind(m.effective_date)
            .bind(m.description)
            .fetch_one(self.pool)
            .await?)
    }

    pub async fn update_modification(
        &self,
        id: i32,
        m: LoanModificationPatch,
    ) -> Result<LoanModification, DbError> {
        let mut set = Assignments::new("banking.loan_modification");
        set.set_opt("modification_type", m.modification_type)
            .set_opt("effective_date", m.effective_date)
            .set_opt("description", m.description);
        let mut query = set.finish("loan_modification_id", id, false, MODIFICATION_COLUMNS)?;
        query
            .build_query_as::<LoanModification>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("loan modification", id)
    }

    pub async fn delete_modification(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM banking.loan_modification WHERE loan_modification_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("loan modification", id));
        }
        Ok(())
    }
}
