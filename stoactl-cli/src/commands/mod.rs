//! Command implementations for the stoactl CLI

pub mod config;
pub mod domo_sync;
pub mod migrate;
pub mod reminders;
pub mod serve;

pub use config::run_config;
pub use domo_sync::run_domo_sync;
pub use migrate::run_migrate;
pub use reminders::run_reminders;
pub use serve::run_serve;

use anyhow::{Context, Result};
use stoactl_core::StoaConfig;
use stoactl_server::db::{create_pool_with_options, migrations, PgPool};

/// Database URL from the flag, else config/environment.
pub(crate) fn database_url(flag: Option<String>, config: &StoaConfig) -> Result<String> {
    flag.or_else(|| config.database.url.clone())
        .filter(|u| !u.trim().is_empty())
        .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or [database] url in stoactl.toml")
}

/// Connect and bring the schema up to date.
pub(crate) async fn connect_and_migrate(url: &str, config: &StoaConfig) -> Result<PgPool> {
    let pool = create_pool_with_options(url, config.server.max_connections)
        .await
        .context("Failed to create database pool")?;
    migrations::run(&pool)
        .await
        .context("Failed to run schema migrations")?;
    Ok(pool)
}
