//! Covenant repository, the loan-driven covenant sync and reminder queries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use stoactl_core::enums::CovenantType;

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::banking::{CovenantPatch, NewCovenant};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Covenant {
    pub covenant_id: i32,
    pub project_id: i32,
    pub project_name: Option<String>,
    pub loan_id: Option<i32>,
    pub covenant_type: String,
    pub requirement: Option<String>,
    pub threshold: Option<Decimal>,
    pub compliance_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub reminder_email: Option<String>,
    pub reminder_days_before: Option<i32>,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,
    pub auto_synced: bool,
    pub notes: Option<String>,
}

const SELECT: &str = r#"
    SELECT c.covenant_id, c.project_id, p.project_name, c.loan_id, c.covenant_type,
           c.requirement, c.threshold, c.compliance_date, c.is_completed,
           c.reminder_email, c.reminder_days_before, c.last_reminder_sent_at,
           c.auto_synced, c.notes
    FROM banking.covenant c
    LEFT JOIN core.project p ON p.project_id = c.project_id
"#;

/// The loan fields that drive auto-synced covenants
#[derive(Debug, Clone, PartialEq)]
pub struct LoanCovenantTerms {
    pub loan_id: i32,
    pub project_id: i32,
    pub dscr_requirement: Option<Decimal>,
    pub dscr_test_date: Option<NaiveDate>,
    pub occupancy_requirement: Option<Decimal>,
    pub occupancy_test_date: Option<NaiveDate>,
}

/// Requirement text shown on an auto-synced covenant.
pub fn requirement_label(kind: CovenantType, value: Option<Decimal>) -> Option<String> {
    let v = value?.normalize();
    match kind {
        CovenantType::Dscr => Some(format!("{v}x")),
        CovenantType::Occupancy => Some(format!("{v}%")),
        _ => Some(v.to_string()),
    }
}

/// Keep the loan's DSCR and Occupancy covenants in step with its test dates.
///
/// A test date upserts the auto-synced covenant; clearing it removes the
/// auto-synced covenant unless it was already completed. Covenants entered
/// by hand are never touched.
pub(crate) async fn sync_loan_covenants(
    conn: &mut PgConnection,
    terms: &LoanCovenantTerms,
) -> Result<(), DbError> {
    let pairs = [
        (CovenantType::Dscr, terms.dscr_requirement, terms.dscr_test_date),
        (CovenantType::Occupancy, terms.occupancy_requirement, terms.occupancy_test_date),
    ];

    for (kind, requirement, date) in pairs {
        match date {
            Some(date) => {
                let label = requirement_label(kind, requirement);
                let updated = sqlx::query(
                    r#"
                    UPDATE banking.covenant
                    SET project_id = $1, requirement = $2, threshold = $3, compliance_date = $4
                    WHERE loan_id = $5 AND covenant_type = $6 AND auto_synced
                    "#,
                )
                .bind(terms.project_id)
                .bind(&label)
                .bind(requirement)
                .bind(date)
                .bind(terms.loan_id)
                .bind(kind.as_str())
                .execute(&mut *conn)
                .await?;

                if updated.rows_affected() == 0 {
                    sqlx::query(
                        r#"
                        INSERT INTO banking.covenant
                            (project_id, loan_id, covenant_type, requirement, threshold, compliance_date, auto_synced)
                        VALUES ($1, $2, $3, $4, $5, $6, TRUE)
                        "#,
                    )
                    .bind(terms.project_id)
                    .bind(terms.loan_id)
                    .bind(kind.as_str())
                    .bind(&label)
                    .bind(requirement)
                    .bind(date)
                    .execute(&mut *conn)
                    .await?;
                }
                tracing::debug!(loan_id = terms.loan_id, covenant = kind.as_str(), %date, "covenant synced");
            }
            None => {
                let removed = sqlx::query(
                    "DELETE FROM banking.covenant \
                     WHERE loan_id = $1 AND covenant_type = $2 AND auto_synced AND NOT is_completed",
                )
                .bind(terms.loan_id)
                .bind(kind.as_str())
                .execute(&mut *conn)
                .await?;
                if removed.rows_affected() > 0 {
                    tracing::debug!(loan_id = terms.loan_id, covenant = kind.as_str(), "auto covenant removed");
                }
            }
        }
    }
    Ok(())
}

/// A covenant due for a reminder email
#[derive(Debug, Clone, FromRow)]
pub struct ReminderCandidate {
    pub covenant_id: i32,
    pub reminder_email: String,
    pub project_name: String,
    pub lender_name: Option<String>,
    pub loan_id: Option<i32>,
    pub covenant_type: String,
    pub requirement: Option<String>,
    pub compliance_date: NaiveDate,
}

pub struct CovenantRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CovenantRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        project_id: Option<i32>,
        loan_id: Option<i32>,
    ) -> Result<Vec<Covenant>, DbError> {
        let sql = format!(
            "{SELECT} WHERE ($1::int IS NULL OR c.project_id = $1) \
             AND ($2::int IS NULL OR c.loan_id = $2) \
             ORDER BY c.compliance_date NULLS LAST, c.covenant_id"
        );
        Ok(sqlx::query_as::<_, Covenant>(&sql)
            .bind(project_id)
            .bind(loan_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<Covenant, DbError> {
        let sql = format!("{SELECT} WHERE c.covenant_id = $1");
        sqlx::query_as::<_, Covenant>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found("covenant", id)
    }

    pub async fn create(&self, c: NewCovenant) -> Result<Covenant, DbError> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO banking.covenant
                (project_id, loan_id, covenant_type, requirement, threshold, compliance_date,
                 is_completed, reminder_email, reminder_days_before, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING covenant_id
            "#,
        )
        .bind(c.project_id)
        .bind(c.loan_id)
        .bind(c.covenant_type)
        .bind(c.requirement)
        .bind(c.threshold)
        .bind(c.compliance_date)
        .bind(c.is_completed.unwrap_or(false))
        .bind(c.reminder_email)
        .bind(c.reminder_days_before)
        .bind(c.notes)
        .fetch_one(self.pool)
        .await?;
        self.get(id).await
    }

    pub async fn update(&self, id: i32, c: CovenantPatch) -> Result<Covenant, DbError> {
        let mut set = Assignments::new("banking.covenant");
        set.set_opt("loan_id", c.loan_id)
            .set_opt("covenant_type", c.covenant_type)
            .set_opt("requirement", c.requirement)
            .set_opt("threshold", c.threshold)
            .set_opt("compliance_date", c.compliance_date)
            .set_opt("is_completed", c.is_completed)
            .set_opt("reminder_email", c.reminder_email)
            .set_opt("reminder_days_before", c.reminder_days_before)
            .set_opt("notes", c.notes);
        let mut query = set.finish("covenant_id", id, false, "covenant_id")?;
        query
            .build_query_scalar::<i32>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("covenant", id)?;
        self.get(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM banking.covenant WHERE covenant_id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| DbError::from(e).on_delete())?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("covenant", id));
        }
        Ok(())
    }

    /// Open covenants whose compliance date falls within their reminder
    /// window of `as_of` and that were not reminded within that window.
    pub async fn reminder_candidates(
        &self,
        as_of: NaiveDate,
        default_days_before: i32,
    ) -> Result<Vec<ReminderCandidate>, DbError> {
        Ok(sqlx::query_as::<_, ReminderCandidate>(
            r#"
            SELECT c.covenant_id, c.reminder_email, p.project_name,
                   b.bank_name AS lender_name, c.loan_id, c.covenant_type,
                   c.requirement, c.compliance_date
            FROM banking.covenant c
            JOIN core.project p ON p.project_id = c.project_id
            LEFT JOIN banking.loan l ON l.loan_id = c.loan_id
            LEFT JOIN core.bank b ON b.bank_id = l.lender_id
            WHERE NOT c.is_completed
              AND c.reminder_email IS NOT NULL AND c.reminder_email <> ''
              AND c.compliance_date IS NOT NULL
              AND c.compliance_date >= $1::date
              AND c.compliance_date <= $1::date + COALESCE(c.reminder_days_before, $2)
              AND (c.last_reminder_sent_at IS NULL
                   OR c.last_reminder_sent_at < ($1::date - COALESCE(c.reminder_days_before, $2))::timestamptz)
            ORDER BY c.compliance_date, c.covenant_id
            "#,
        )
        .bind(as_of)
        .bind(default_days_before)
        .fetch_all(self.pool)
        .await?)
    }

    pub async fn mark_reminded(&self, id: i32) -> Result<(), DbError> {
        sqlx::query("UPDATE banking.covenant SET last_reminder_sent_at = NOW() WHERE covenant_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_labels() {
        assert_eq!(
            requirement_label(CovenantType::Dscr, Some(Decimal::new(12500, 4))).as_deref(),
            Some("1.25x")
        );
        assert_eq!(
            requirement_label(CovenantType::Occupancy, Some(Decimal::new(9000, 2))).as_deref(),
            Some("90%")
        );
        assert_eq!(requirement_label(CovenantType::Dscr, None), None);
    }
}
