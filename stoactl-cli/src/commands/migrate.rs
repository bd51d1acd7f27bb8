//! Apply the embedded schema migrations and exit.

use anyhow::Result;
use clap::Parser;
use stoactl_core::StoaConfig;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config: StoaConfig) -> Result<()> {
    let url = super::database_url(args.database_url, &config)?;
    let pool = super::connect_and_migrate(&url, &config).await?;
    pool.close().await;
    println!("✓ Schema is up to date");
    Ok(())
}
