//! Repository implementations for database access
//!
//! Each repository borrows the pool, maps rows with `sqlx::FromRow`, and
//! builds partial updates with [`Assignments`](crate::db::update::Assignments).

pub mod banks;
pub mod bank_targets;
pub mod contacts;
pub mod covenants;
pub mod dscr_tests;
pub mod equity;
pub mod equity_partners;
pub mod files;
pub mod guarantees;
pub mod leasing;
pub mod liquidity;
pub mod loan_activity;
pub mod loans;
pub mod participations;
pub mod persons;
pub mod projects;
pub mod reference;
pub mod settings;

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::PgConnection;

use super::DbError;

/// Rows removed by a cascading delete, per table
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CascadeReport {
    pub deleted: BTreeMap<&'static str, u64>,
    #[serde(skip)]
    pub storage_keys: Vec<String>,
}

impl CascadeReport {
    pub fn total(&self) -> u64 {
        self.deleted.values().sum()
    }
}

/// Run one `DELETE ... WHERE <predicate on $1>` step and record its count.
pub(crate) async fn delete_step(
    conn: &mut PgConnection,
    report: &mut CascadeReport,
    table: &'static str,
    sql: &str,
    id: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(sql)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).on_delete())?;
    report.deleted.insert(table, result.rows_affected());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_report_serializes_counts_only() {
        let mut report = CascadeReport::default();
        report.deleted.insert("banking.loan", 2);
        report.deleted.insert("core.project", 1);
        report.storage_keys.push("projects/1/a.pdf".into());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["Deleted"]["banking.loan"], 2);
        assert!(json.get("StorageKeys").is_none());
        assert_eq!(report.total(), 3);
    }
}
