//! stoactl CLI - banking dashboard API server and operational jobs
//!
//! Subcommands:
//! - `serve`: run the HTTP API (core, banking, leasing)
//! - `migrate`: apply schema migrations and exit
//! - `domo-sync`: pull leasing datasets from Domo and push them to the API
//! - `reminders`: send due covenant reminders (cron)
//! - `config`: inspect the effective configuration
//!
//! Exit codes: 0 success, 1 configuration or runtime error, 2 sync finished
//! with per-dataset errors.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stoactl_core::StoaConfig;

mod commands;
mod tracing_setup;
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "stoactl",
    author,
    version,
    about = "Commercial real-estate banking dashboard: API server, Domo leasing sync and covenant reminders"
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress progress spinners (for cron/script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Apply database migrations and exit
    Migrate(commands::migrate::MigrateArgs),
    /// Export leasing datasets from Domo and push them to the API
    DomoSync(commands::domo_sync::DomoSyncArgs),
    /// Send due covenant reminders
    Reminders(commands::reminders::RemindersArgs),
    /// Inspect stoactl configuration (show, path)
    Config(commands::config::ConfigArgs),
}

const EXIT_FAILURE: u8 = 1;
const EXIT_SYNC_ERRORS: u8 = 2;

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = StoaConfig::load()?;

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args, config).await?,
        Commands::Migrate(args) => commands::run_migrate(args, config).await?,
        Commands::DomoSync(args) => {
            if !commands::run_domo_sync(args, config).await? {
                return Ok(ExitCode::from(EXIT_SYNC_ERRORS));
            }
        }
        Commands::Reminders(args) => commands::run_reminders(args, config).await?,
        Commands::Config(args) => commands::run_config(args, &config)?,
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Usage errors exit 1 so that 2 stays reserved for sync errors.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();
    ui::init_quiet_mode(cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
