//! Scheduled leasing sync: pull datasets from Domo (or local JSON files) and
//! push them to a running server's `/api/leasing/sync`.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use stoactl_core::leasing::{data_hash, DatasetKey, SyncReport};
use stoactl_core::StoaConfig;
use stoactl_domo::{load_local_json, DatasetPayload, DomoClient, PushClient, PushOptions};

use crate::ui;

#[derive(Parser, Debug)]
pub struct DomoSyncArgs {
    /// Read a dataset from a local JSON file instead of Domo (repeatable)
    #[arg(long = "local", value_name = "KEY=PATH")]
    pub local: Vec<String>,

    /// Fetch and summarize without pushing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the portfolio unit details export (largest dataset)
    #[arg(long)]
    pub skip_pud: bool,

    /// Sync a single dataset
    #[arg(long, value_name = "KEY")]
    pub only: Option<String>,

    /// Backend base URL (default: API_BASE_URL / [domo] backend_url)
    #[arg(long, value_name = "URL")]
    pub api_base_url: Option<String>,
}

/// Dataset filter from `--only` and `--skip-pud`
#[derive(Debug, Clone, Copy, Default)]
struct Selection {
    only: Option<DatasetKey>,
    skip_pud: bool,
}

impl Selection {
    fn wants(&self, key: DatasetKey) -> bool {
        if self.skip_pud && key == DatasetKey::PortfolioUnitDetails {
            return false;
        }
        self.only.map_or(true, |only| only == key)
    }
}

/// Parse `KEY=PATH`.
fn parse_local_arg(raw: &str) -> Result<(DatasetKey, PathBuf)> {
    let (key, path) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("--local expects KEY=PATH, got '{raw}'"))?;
    let key = DatasetKey::from_str(key)?;
    let path = path.trim();
    if path.is_empty() {
        bail!("--local {key}: path is empty");
    }
    Ok((key, PathBuf::from(path)))
}

fn load_local(args: &[String], selection: Selection, report: &mut SyncReport) -> Result<Vec<DatasetPayload>> {
    let mut payloads = Vec::new();
    for arg in args {
        let (key, path) = parse_local_arg(arg)?;
        if !selection.wants(key) {
            continue;
        }
        match load_local_json(&path) {
            Ok(rows) => {
                tracing::info!(dataset = %key, rows = rows.len(), path = %path.display(), "loaded local dataset");
                payloads.push(DatasetPayload { key, rows });
            }
            Err(e) => report.error(key.as_str(), format!("{}: {e}", path.display())),
        }
    }
    Ok(payloads)
}

async fn export_from_domo(
    config: &StoaConfig,
    selection: Selection,
    report: &mut SyncReport,
) -> Result<Vec<DatasetPayload>> {
    let client = DomoClient::from_config(&config.domo)
        .context("Domo credentials missing: set DOMO_CLIENT_ID and DOMO_CLIENT_SECRET")?;

    let datasets: Vec<_> = config
        .domo
        .dataset_ids()
        .into_iter()
        .filter(|(key, _)| selection.wants(*key))
        .collect();
    if datasets.is_empty() {
        bail!("no Domo dataset ids configured for the selected datasets (DOMO_DATASET_* variables)");
    }

    let mut payloads = Vec::new();
    for (key, id) in datasets {
        let pb = ui::spinner(format!("Exporting {key} from Domo"));
        match client.export_dataset(&id).await {
            Ok(rows) => {
                ui::finish_success(pb, format!("{key}: {} rows", rows.len()));
                payloads.push(DatasetPayload { key, rows });
            }
            Err(e) => {
                ui::finish_error(pb, format!("{key}: {e}"));
                tracing::error!(dataset = %key, error = %e, "Domo export failed");
                report.error(key.as_str(), e.to_string());
            }
        }
    }
    Ok(payloads)
}

/// Returns `Ok(false)` when any dataset failed (exit code 2).
pub async fn run_domo_sync(args: DomoSyncArgs, config: StoaConfig) -> Result<bool> {
    let selection = Selection {
        only: args.only.as_deref().map(DatasetKey::from_str).transpose()?,
        skip_pud: args.skip_pud,
    };

    let mut report = SyncReport::new();
    let payloads = if args.local.is_empty() {
        export_from_domo(&config, selection, &mut report).await?
    } else {
        load_local(&args.local, selection, &mut report)?
    };

    if args.dry_run {
        for payload in &payloads {
            println!(
                "{:<24} {:>8} rows  hash {}",
                payload.key.as_str(),
                payload.rows.len(),
                data_hash(&payload.rows)
            );
        }
        let summary = serde_json::json!({
            "keys": payloads.iter().map(|p| p.key.as_str()).collect::<Vec<_>>(),
            "total_rows": payloads.iter().map(|p| p.rows.len()).sum::<usize>(),
        });
        println!("{summary}");
        println!("(dry run: nothing pushed)");
        return Ok(!report.has_errors());
    }

    if payloads.is_empty() {
        for error in report.errors.iter().flatten() {
            eprintln!("{}: {}", error.dataset, error.message);
        }
        bail!("No data to sync.");
    }

    let base_url = args
        .api_base_url
        .or_else(|| config.domo.backend_url.clone())
        .filter(|u| !u.trim().is_empty())
        .context("backend URL not set. Use --api-base-url or API_BASE_URL")?;

    let push = PushClient::new(&base_url, PushOptions::default())?;
    let pb = ui::spinner(format!("Pushing {} dataset(s) to {}", payloads.len(), push.sync_url()));
    let pushed = push.push(&payloads).await;
    let summary = format!("{} synced, {} skipped", pushed.synced.len(), pushed.skipped.len());
    if pushed.has_errors() {
        ui::finish_error(pb, format!("{summary}, {} failed", pushed.errors.as_ref().map_or(0, Vec::len)));
    } else {
        ui::finish_success(pb, summary);
    }
    report.merge(pushed);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(!report.has_errors())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_args_parse() {
        let (key, path) = parse_local_arg("leasing=./data/leasing.json").unwrap();
        assert_eq!(key, DatasetKey::Leasing);
        assert_eq!(path, PathBuf::from("./data/leasing.json"));

        assert!(parse_local_arg("leasing").is_err());
        assert!(parse_local_arg("rentroll=./x.json").is_err());
        assert!(parse_local_arg("leasing=").is_err());
    }

    #[test]
    fn selection_honours_only_and_skip_pud() {
        let all = Selection::default();
        assert!(all.wants(DatasetKey::PortfolioUnitDetails));

        let skip = Selection { skip_pud: true, ..Selection::default() };
        assert!(!skip.wants(DatasetKey::PortfolioUnitDetails));
        assert!(skip.wants(DatasetKey::Leasing));

        let only = Selection { only: Some(DatasetKey::Units), skip_pud: false };
        assert!(only.wants(DatasetKey::Units));
        assert!(!only.wants(DatasetKey::Leasing));
    }

    #[test]
    fn missing_local_file_is_reported_per_dataset() {
        let mut report = SyncReport::new();
        let args = vec!["units=/definitely/not/here.json".to_owned()];
        let payloads = load_local(&args, Selection::default(), &mut report).unwrap();
        assert!(payloads.is_empty());
        assert!(report.has_errors());
    }

    #[test]
    fn local_files_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.json");
        std::fs::write(&path, r#"[{"Property": "Elm", "Unit": "101"}]"#).unwrap();

        let mut report = SyncReport::new();
        let args = vec![format!("units={}", path.display())];
        let payloads = load_local(&args, Selection::default(), &mut report).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].rows.len(), 1);
        assert!(!report.has_errors());
    }
}
