//! DSCR test repository.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use stoactl_core::finance::dscr_passed;

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{DscrTestPatch, NewDscrTest};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct DscrTest {
    pub dscr_test_id: i32,
    pub project_id: i32,
    pub loan_id: Option<i32>,
    pub test_number: Option<i32>,
    pub test_date: Option<NaiveDate>,
    pub requirement: Option<Decimal>,
    pub projected_value: Option<Decimal>,
    pub actual_value: Option<Decimal>,
    #[sqlx(skip)]
    pub passed: Option<bool>,
}

impl DscrTest {
    fn with_result(mut self) -> Self {
        self.passed = dscr_passed(self.requirement, self.actual_value);
        self
    }
}

const COLUMNS: &str =
    "dscr_test_id, project_id, loan_id, test_number, test_date, requirement, projected_value, actual_value";

pub struct DscrTestRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DscrTestRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        project_id: Option<i32>,
        loan_id: Option<i32>,
    ) -> Result<Vec<DscrTest>, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM banking.dscr_test \
             WHERE ($1::int IS NULL OR project_id = $1) AND ($2::int IS NULL OR loan_id = $2) \
             ORDER BY project_id, test_number NULLS LAST, test_date"
        );
        let rows = sqlx::query_as::<_, DscrTest>(&sql)
            .bind(project_id)
            .bind(loan_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(DscrTest::with_result).collect())
    }

    pub async fn get(&self, id: i32) -> Result<DscrTest, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM banking.dscr_test WHERE dscr_test_id = $1");
        sqlx::query_as::<_, DscrTest>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(DscrTest::with_result)
            .or_not_found("DSCR test", id)
    }

    pub async fn create(&self, t: NewDscrTest) -> Result<DscrTest, DbError> {
        let sql = format!(
            "INSERT INTO banking.dscr_test \
                (project_id, loan_id, test_number, test_date, requirement, projected_value, actual_value) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DscrTest>(&sql)
            .bind(t.project_id)
            .bind(t.loan_id)
            .bind(t.test_number)
            .bind(t.test_date)
            .bind(t.requirement)
            .bind(t.projected_value)
            .bind(t.actual_value)
            .fetch_one(self.pool)
            .await?;
        Ok(row.with_result())
    }

    pub async fn update(&self, id: i32, t: DscrTestPatch) -> Result<DscrTest, DbError> {
        let mut set = Assignments::new("banking.dscr_test");
        set.set_opt("loan_id", t.loan_id)
            .set_opt("test_number", t.test_number)
            .set_opt("test_date", t.test_date)
            .set_opt("requirement", t.requirement)
            .set_opt("projected_value", t.projected_value)
            .set_opt("actual_value", t.actual_value);
        let mut query = set.finish("dscr_test_id", id, false, COLUMNS)?;
        query
            .build_query_as::<DscrTest>()
            .fetch_optional(self.pool)
            .await?
            .map(DscrTest::with_result)
            .or_not_found("DSCR test", id)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM banking.dscr_test WHERE dscr_test_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DSCR test", id));
        }
        Ok(())
    }
}
