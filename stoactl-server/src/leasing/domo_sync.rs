//! Pull datasets straight from Domo into the leasing tables.

use stoactl_core::leasing::{DatasetKey, SyncReport};
use stoactl_domo::{DomoClient, DomoError};

use super::ingest::{IngestOutcome, Ingestor};
use super::LeasingError;
use crate::db::repos::leasing::{LeasingRepo, NewSyncLog, SyncSource, SyncStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct DomoSyncOptions {
    /// Export even when Domo reports the same row count as the last sync
    pub force: bool,
    /// Limit the run to one dataset
    pub only: Option<DatasetKey>,
}

/// Which configured datasets a run covers.
pub fn select_datasets(
    configured: Vec<(DatasetKey, String)>,
    only: Option<DatasetKey>,
) -> Vec<(DatasetKey, String)> {
    configured
        .into_iter()
        .filter(|(key, _)| only.map_or(true, |o| o == *key))
        .collect()
}

async fn sync_one(
    client: &DomoClient,
    ingestor: &Ingestor,
    repo: &LeasingRepo<'_>,
    key: DatasetKey,
    dataset_id: &str,
    force: bool,
) -> Result<IngestOutcome, LeasingError> {
    if !force {
        let remote = client.dataset_row_count(dataset_id).await?;
        let last = repo.last_success(key).await?;
        if let (Some(remote), Some(last)) = (remote, last) {
            if u64::try_from(last.row_count).is_ok_and(|n| n == remote) {
                repo.record_sync(&NewSyncLog {
                    dataset: key,
                    row_count: last.row_count.max(0) as usize,
                    data_hash: last.data_hash.as_deref(),
                    source: SyncSource::Domo,
                    status: SyncStatus::Skipped,
                    message: Some("row count unchanged"),
                })
                .await?;
                return Ok(IngestOutcome::Skipped {
                    reason: "row count unchanged",
                });
            }
        }
    }

    let rows = client.export_dataset(dataset_id).await?;
    tracing::info!(dataset = %key, rows = rows.len(), "exported from Domo");
    Ok(ingestor.replace(key, &rows, SyncSource::Domo).await?)
}

/// Sync every selected dataset, collecting per-dataset failures.
///
/// Only configuration problems and a failed token request abort the run.
pub async fn run(
    client: &DomoClient,
    ingestor: &Ingestor,
    repo: &LeasingRepo<'_>,
    datasets: Vec<(DatasetKey, String)>,
    options: DomoSyncOptions,
) -> Result<SyncReport, LeasingError> {
    let mut report = SyncReport::new();
    if let Some(only) = options.only {
        if datasets.iter().all(|(key, _)| *key != only) {
            report.error(only.as_str(), "no Domo dataset id configured");
            return Ok(report);
        }
    }

    client.access_token().await?;

    for (key, dataset_id) in datasets {
        match sync_one(client, ingestor, repo, key, &dataset_id, options.force).await {
            Ok(IngestOutcome::Synced { rows }) => report.synced(key.as_str(), rows, None),
            Ok(IngestOutcome::Skipped { reason }) => report.skipped(key.as_str(), reason),
            Err(e) => {
                tracing::warn!(dataset = %key, error = %e, "Domo sync failed for dataset");
                ingestor.record_failure(key, SyncSource::Domo, &e.to_string()).await;
                report.error(key.as_str(), e.to_string());
            }
        }
    }
    Ok(report)
}

impl From<DomoError> for LeasingError {
    fn from(e: DomoError) -> Self {
        match e {
            DomoError::MissingCredentials => Self::NotConfigured,
            other => Self::Domo(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_honours_only() {
        let configured = vec![
            (DatasetKey::Leasing, "a".to_owned()),
            (DatasetKey::Units, "b".to_owned()),
        ];
        assert_eq!(select_datasets(configured.clone(), None).len(), 2);
        let only = select_datasets(configured, Some(DatasetKey::Units));
        assert_eq!(only, vec![(DatasetKey::Units, "b".to_owned())]);
    }

    #[test]
    fn missing_credentials_is_a_configuration_error() {
        assert!(matches!(
            LeasingError::from(DomoError::MissingCredentials),
            LeasingError::NotConfigured
        ));
        assert!(matches!(
            LeasingError::from(DomoError::Payload("x".into())),
            LeasingError::Domo(_)
        ));
    }
}
