//! Project repository, including the project-wide cascade delete.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::{delete_step, CascadeReport};
use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::core_entities::{NewProject, ProjectPatch};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
    pub project_id: i32,
    pub project_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub region_id: Option<i32>,
    pub region_name: Option<String>,
    pub product_type_id: Option<i32>,
    pub product_type_name: Option<String>,
    pub units: Option<i32>,
    pub stage: Option<String>,
    pub estimated_construction_start: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT: &str = r#"
    SELECT p.project_id, p.project_name, p.city, TRIM(p.state) AS state,
           p.region_id, r.name AS region_name,
           p.product_type_id, pt.name AS product_type_name,
           p.units, p.stage, p.estimated_construction_start,
           p.created_at, p.updated_at
    FROM core.project p
    LEFT JOIN core.region r ON r.region_id = p.region_id
    LEFT JOIN core.product_type pt ON pt.product_type_id = p.product_type_id
"#;

/// Loans of the project, as a subquery on `$1`
const PROJECT_LOANS: &str = "SELECT loan_id FROM banking.loan WHERE project_id = $1";

pub struct ProjectRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ProjectRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Project>, DbError> {
        let sql = format!("{SELECT} ORDER BY p.project_name");
        Ok(sqlx::query_as::<_, Project>(&sql).fetch_all(self.pool).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Project, DbError> {
        let sql = format!("{SELECT} WHERE p.project_id = $1");
        sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found("project", id)
    }

    pub async fn create(&self, p: NewProject) -> Result<Project, DbError> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO core.project
                (project_name, city, state, region_id, product_type_id, units, stage, estimated_construction_start)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING project_id
            "#,
        )
        .bind(p.project_name)
        .bind(p.city)
        .bind(p.state)
        .bind(p.region_id)
        .bind(p.product_type_id)
        .bind(p.units)
        .bind(p.stage)
        .bind(p.estimated_construction_start)
        .fetch_one(self.pool)
        .await?;
        self.get(id).await
    }

    pub async fn update(&self, id: i32, p: ProjectPatch) -> Result<Project, DbError> {
        let mut set = Assignments::new("core.project");
        set.set_opt("project_name", p.project_name)
            .set_opt("city", p.city)
            .set_opt("state", p.state)
            .set_opt("region_id", p.region_id)
            .set_opt("product_type_id", p.product_type_id)
            .set_opt("units", p.units)
            .set_opt("stage", p.stage)
            .set_opt("estimated_construction_start", p.estimated_construction_start);
        let mut query = set.finish("project_id", id, true, "project_id")?;
        query
            .build_query_scalar::<i32>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("project", id)?;
        self.get(id).await
    }

    /// Delete the project and everything hanging off it, in one transaction.
    ///
    /// Storage keys of deleted files are returned so the caller can remove
    /// the blobs after commit.
    pub async fn delete_cascade(&self, id: i32) -> Result<CascadeReport, DbError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT project_id FROM core.project WHERE project_id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        exists.or_not_found("project", id)?;

        let mut report = CascadeReport::default();
        let steps: [(&'static str, String); 11] = [
            (
                "banking.equity_commitment_related_party",
                "DELETE FROM banking.equity_commitment_related_party WHERE equity_commitment_id IN \
                 (SELECT equity_commitment_id FROM banking.equity_commitment WHERE project_id = $1)"
                    .to_string(),
            ),
            (
                "banking.equity_commitment",
                "DELETE FROM banking.equity_commitment WHERE project_id = $1".to_string(),
            ),
            (
                "banking.guarantee_burndown",
                format!(
                    "DELETE FROM banking.guarantee_burndown WHERE guarantee_id IN \
                     (SELECT guarantee_id FROM banking.guarantee WHERE project_id = $1 OR loan_id IN ({PROJECT_LOANS}))"
                ),
            ),
            (
                "banking.guarantee",
                format!("DELETE FROM banking.guarantee WHERE project_id = $1 OR loan_id IN ({PROJECT_LOANS})"),
            ),
            (
                "banking.covenant",
                format!("DELETE FROM banking.covenant WHERE project_id = $1 OR loan_id IN ({PROJECT_LOANS})"),
            ),
            (
                "banking.dscr_test",
                format!("DELETE FROM banking.dscr_test WHERE project_id = $1 OR loan_id IN ({PROJECT_LOANS})"),
            ),
            (
                "banking.liquidity_requirement",
                format!(
                    "DELETE FROM banking.liquidity_requirement WHERE project_id = $1 OR loan_id IN ({PROJECT_LOANS})"
                ),
            ),
            (
                "banking.participation",
                format!("DELETE FROM banking.participation WHERE loan_id IN ({PROJECT_LOANS})"),
            ),
            (
                "banking.loan_proceeds",
                format!("DELETE FROM banking.loan_proceeds WHERE project_id = $1 OR loan_id IN ({PROJECT_LOANS})"),
            ),
            (
                "banking.loan_modification",
                format!(
                    "DELETE FROM banking.loan_modification WHERE project_id = $1 OR loan_id IN ({PROJECT_LOANS})"
                ),
            ),
            (
                "banking.loan",
                "DELETE FROM banking.loan WHERE project_id = $1".to_string(),
            ),
        ];
        for (table, sql) in &steps {
            delete_step(&mut tx, &mut report, *table, sql, id).await?;
        }

        let keys: Vec<String> = sqlx::query_scalar(
            "DELETE FROM banking.banking_file WHERE project_id = $1 RETURNING storage_key",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).on_delete())?;
        report.deleted.insert("banking.banking_file", keys.len() as u64);
        report.storage_keys = keys;

        delete_step(
            &mut tx,
            &mut report,
            "core.project",
            "DELETE FROM core.project WHERE project_id = $1",
            id,
        )
        .await?;

        tx.commit().await?;
        tracing::info!(project_id = id, rows = report.total(), "project deleted with dependents");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    // Run with: DATABASE_URL=... cargo test -p stoactl-server -- --ignored

    use super::*;
    use crate::db::{create_pool, migrations};

    #[tokio::test]
    #[ignore = "requires database"]
    async fn cascade_counts_children() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool");
        migrations::run(&pool).await.expect("migrations");

        let repo = ProjectRepo::new(&pool);
        let name = format!("cascade-{}", uuid::Uuid::new_v4());
        let project = repo
            .create(NewProject {
                project_name: name,
                city: None,
                state: None,
                region_id: None,
                product_type_id: None,
                units: Some(10),
                stage: None,
                estimated_construction_start: None,
            })
            .await
            .expect("create");

        sqlx::query("INSERT INTO banking.loan (project_id, loan_amount) VALUES ($1, 100), ($1, 200)")
            .bind(project.project_id)
            .execute(&pool)
            .await
            .expect("loans");

        let report = repo.delete_cascade(project.project_id).await.expect("delete");
        assert_eq!(report.deleted["banking.loan"], 2);
        assert_eq!(report.deleted["core.project"], 1);
        assert!(matches!(
            repo.get(project.project_id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
