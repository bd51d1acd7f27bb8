//! Leasing data services: ingestion, the Domo pull, the dashboard snapshot
//! and its debounced rebuild.

pub mod debounce;
pub mod domo_sync;
pub mod ingest;
pub mod snapshot;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use sqlx::PgPool;
use stoactl_core::config::{DomoSection, LeasingSection};
use stoactl_core::leasing::{KpiWindows, SyncReport};
use stoactl_domo::{DomoClient, DomoError};
use thiserror::Error;

use crate::db::repos::leasing::LeasingRepo;
use crate::db::DbError;
pub use debounce::Debouncer;
pub use domo_sync::DomoSyncOptions;
pub use ingest::{ChunkInfo, Ingestor};
pub use snapshot::{Snapshot, SnapshotStore};

#[derive(Debug, Error)]
pub enum LeasingError {
    #[error("{0} already in progress")]
    Busy(&'static str),

    #[error("Domo credentials are not configured")]
    NotConfigured,

    #[error("Domo request failed: {0}")]
    Domo(DomoError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("failed to serialize dashboard: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Clears a busy flag when dropped, including when the owning future is
/// cancelled mid-await.
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    /// `None` when the flag is already set.
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything the leasing routes need, shared through `AppState`
pub struct LeasingService {
    pool: PgPool,
    domo: DomoSection,
    /// `None` when Domo credentials are not configured
    domo_client: Option<DomoClient>,
    ingestor: Ingestor,
    snapshots: Arc<SnapshotStore>,
    rebuild: Debouncer,
    domo_running: AtomicBool,
}

impl LeasingService {
    /// Must be called inside a Tokio runtime; spawns the rebuild debouncer.
    pub fn new(pool: PgPool, settings: &LeasingSection, domo: DomoSection) -> Self {
        let windows = KpiWindows {
            velocity_days: settings.velocity_window_days,
            tradeout_days: settings.tradeout_window_days,
        };
        let snapshots = Arc::new(SnapshotStore::new(pool.clone(), windows));

        let store = snapshots.clone();
        let rebuild = Debouncer::spawn(Duration::from_millis(settings.rebuild_debounce_ms), move || {
            let store = store.clone();
            async move {
                match store.rebuild().await {
                    Ok(_) => true,
                    Err(LeasingError::Busy(_)) => false,
                    Err(e) => {
                        tracing::error!(error = %e, "debounced dashboard rebuild failed");
                        true
                    }
                }
            }
        });

        let domo_client = match DomoClient::from_config(&domo) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::info!(reason = %e, "Domo pull disabled");
                None
            }
        };

        Self {
            ingestor: Ingestor::new(pool.clone(), settings),
            pool,
            domo,
            domo_client,
            snapshots,
            rebuild,
            domo_running: AtomicBool::new(false),
        }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn repo(&self) -> LeasingRepo<'_> {
        LeasingRepo::new(&self.pool)
    }

    fn schedule_rebuild_if_synced(&self, report: &SyncReport) {
        if !report.synced.is_empty() {
            tracing::debug!(datasets = report.synced.len(), "scheduling dashboard rebuild");
            self.rebuild.trigger();
        }
    }

    /// Handle a push body, then schedule a rebuild if anything landed.
    pub async fn push(&self, body: Map<String, Value>, chunk: Option<&ChunkInfo>) -> SyncReport {
        let report = self.ingestor.apply_push(body, chunk).await;
        // intermediate chunks leave the tables half-filled
        if chunk.map_or(true, |c| c.last) {
            self.schedule_rebuild_if_synced(&report);
        }
        report
    }

    /// Pull configured datasets from Domo. One run at a time.
    pub async fn sync_from_domo(&self, options: DomoSyncOptions) -> Result<SyncReport, LeasingError> {
        let client = self.domo_client.as_ref().ok_or(LeasingError::NotConfigured)?;
        let _running =
            BusyGuard::try_acquire(&self.domo_running).ok_or(LeasingError::Busy("Domo sync"))?;

        let datasets = domo_sync::select_datasets(self.domo.dataset_ids(), options.only);
        let report = domo_sync::run(client, &self.ingestor, &self.repo(), datasets, options).await?;
        self.schedule_rebuild_if_synced(&report);
        Ok(report)
    }

    pub fn is_domo_sync_running(&self) -> bool {
        self.domo_running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sqlx::postgres::PgPoolOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn busy_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = BusyGuard::try_acquire(&flag);
        assert!(guard.is_some());
        assert!(BusyGuard::try_acquire(&flag).is_none());
        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(BusyGuard::try_acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn cancelled_domo_sync_does_not_stay_busy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "tok", "expires_in": 3600}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let domo = DomoSection {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            api_base: server.uri(),
            backend_url: None,
            datasets: BTreeMap::from([("leasing".to_owned(), "ds-1".to_owned())]),
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let service = LeasingService::new(pool, &LeasingSection::default(), domo);

        let attempt = tokio::time::timeout(
            Duration::from_millis(200),
            service.sync_from_domo(DomoSyncOptions::default()),
        )
        .await;
        assert!(attempt.is_err(), "token request should still be pending");
        assert!(!service.is_domo_sync_running());
    }
}
