//! `stoactl config show|path`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stoactl_core::StoaConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (secrets masked)
    Show,
    /// Show config file path
    Path,
}

pub fn run_config(args: ConfigArgs, config: &StoaConfig) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let rendered = config
                .masked()
                .to_toml_string()
                .context("Failed to render config")?;
            print!("{rendered}");
        }
        ConfigCommands::Path => match StoaConfig::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("(no config file found; using defaults and environment)"),
        },
    }
    Ok(())
}
