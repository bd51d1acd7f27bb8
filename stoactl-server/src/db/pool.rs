//! Postgres pool construction

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Pool size when `[server] max_connections` is not set.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Requests wait this long for a free connection before failing.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Connect with an explicit connection cap (at least one).
pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    tracing::debug!(max_connections, "database pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;

    // DATABASE_URL=postgres://... cargo test -p stoactl-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrated_pool_sees_all_schemas() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool_with_options(&url, 2).await.expect("pool creation failed");
        migrations::run(&pool).await.expect("migrations failed");

        let schemas: Vec<String> = sqlx::query_scalar(
            "SELECT schema_name::text FROM information_schema.schemata \
             WHERE schema_name IN ('core', 'banking', 'leasing') ORDER BY schema_name",
        )
        .fetch_all(&pool)
        .await
        .expect("query failed");

        assert_eq!(schemas, ["banking", "core", "leasing"]);
    }
}
