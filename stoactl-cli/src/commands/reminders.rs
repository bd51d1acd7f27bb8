//! One-shot covenant reminder run, for cron.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use stoactl_core::StoaConfig;
use stoactl_server::mail::{LogMailer, Mailer, OutboxMailer};
use stoactl_server::reminders::send_due_reminders;

#[derive(Parser, Debug)]
pub struct RemindersArgs {
    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Write .eml files into this directory instead of logging messages
    #[arg(long, value_name = "DIR")]
    pub outbox: Option<PathBuf>,

    /// Database URL (overrides config/environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_reminders(args: RemindersArgs, config: StoaConfig) -> Result<()> {
    let url = super::database_url(args.database_url, &config)?;
    let pool = super::connect_and_migrate(&url, &config).await?;

    let mailer: Arc<dyn Mailer> = match args.outbox {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create outbox {}", dir.display()))?;
            Arc::new(OutboxMailer::new(dir))
        }
        None => Arc::new(LogMailer),
    };

    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let report = send_due_reminders(&pool, mailer.as_ref(), &config.reminders, as_of)
        .await
        .context("Failed to send covenant reminders")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.failed > 0 {
        anyhow::bail!("{} reminder(s) failed to send", report.failed);
    }
    Ok(())
}
