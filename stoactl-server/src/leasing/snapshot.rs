//! Precomputed dashboard, cached in memory and persisted in
//! `leasing.dashboard_snapshot`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use sqlx::PgPool;
use stoactl_core::leasing::{compute_dashboard, etag_for, Dashboard, DashboardInputs, DatasetKey, KpiWindows};
use tokio::sync::RwLock;

use super::{BusyGuard, LeasingError};
use crate::db::repos::leasing::{LeasingRepo, StoredSnapshot};

/// One built dashboard and its validator
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub dashboard: Dashboard,
    pub etag: String,
    pub built_at: DateTime<Utc>,
}

impl Snapshot {
    fn build(dashboard: Dashboard, built_at: DateTime<Utc>) -> Result<Self, LeasingError> {
        let body = serde_json::to_vec(&dashboard)?;
        Ok(Self {
            etag: etag_for(&body),
            dashboard,
            built_at,
        })
    }
}

impl From<StoredSnapshot> for Snapshot {
    fn from(stored: StoredSnapshot) -> Self {
        Self {
            dashboard: stored.payload.0,
            etag: stored.etag,
            built_at: stored.built_at,
        }
    }
}

pub struct SnapshotStore {
    pool: PgPool,
    windows: KpiWindows,
    building: AtomicBool,
    cached: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new(pool: PgPool, windows: KpiWindows) -> Self {
        Self {
            pool,
            windows,
            building: AtomicBool::new(false),
            cached: RwLock::new(None),
        }
    }

    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::SeqCst)
    }

    /// The current snapshot: memory, then database, then a fresh build.
    pub async fn current(&self) -> Result<Arc<Snapshot>, LeasingError> {
        if let Some(snapshot) = self.cached.read().await.clone() {
            return Ok(snapshot);
        }

        if let Some(stored) = LeasingRepo::new(&self.pool).load_snapshot().await? {
            let snapshot = Arc::new(Snapshot::from(stored));
            *self.cached.write().await = Some(snapshot.clone());
            return Ok(snapshot);
        }

        tracing::info!("no dashboard snapshot stored, building on demand");
        self.rebuild().await
    }

    /// Recompute from every dataset table. Fails with `Busy` if a rebuild
    /// is already running.
    pub async fn rebuild(&self) -> Result<Arc<Snapshot>, LeasingError> {
        let _guard = BusyGuard::try_acquire(&self.building)
            .ok_or(LeasingError::Busy("dashboard rebuild"))?;

        let started = std::time::Instant::now();
        let repo = LeasingRepo::new(&self.pool);
        let loaded = try_join_all(DatasetKey::ALL.into_iter().map(|key| {
            let repo = &repo;
            async move { repo.all_rows(key).await.map(|rows| (key, rows)) }
        }))
        .await?;

        let mut inputs = DashboardInputs::new();
        let mut total_rows = 0;
        for (key, rows) in loaded {
            total_rows += rows.len();
            inputs.insert(key, rows);
        }

        let now = Utc::now();
        let dashboard = compute_dashboard(&inputs, now.date_naive(), self.windows);
        let mut snapshot = Snapshot::build(dashboard, now)?;
        snapshot.built_at = repo.save_snapshot(&snapshot.dashboard, &snapshot.etag).await?;

        let snapshot = Arc::new(snapshot);
        *self.cached.write().await = Some(snapshot.clone());

        tracing::info!(
            properties = snapshot.dashboard.properties.len(),
            rows = total_rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            etag = %snapshot.etag,
            "dashboard snapshot rebuilt"
        );
        Ok(snapshot)
    }

    /// Install a snapshot without touching the database.
    #[cfg(test)]
    pub(crate) async fn prime(&self, dashboard: Dashboard) -> Result<Arc<Snapshot>, LeasingError> {
        let snapshot = Arc::new(Snapshot::build(dashboard, Utc::now())?);
        *self.cached.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_is_stable_for_identical_dashboards() {
        let inputs = DashboardInputs::new();
        let as_of = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let a = compute_dashboard(&inputs, as_of, KpiWindows::default());
        let b = a.clone();

        let now = Utc::now();
        let first = Snapshot::build(a, now).unwrap();
        let second = Snapshot::build(b, now).unwrap();
        assert_eq!(first.etag, second.etag);
        assert!(first.etag.starts_with('"') && first.etag.ends_with('"'));
    }

    #[tokio::test]
    async fn concurrent_rebuild_is_refused() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let store = SnapshotStore::new(pool, KpiWindows::default());

        store.building.store(true, Ordering::SeqCst);
        assert!(matches!(store.rebuild().await, Err(LeasingError::Busy(_))));
        // the refused call must not clear the running build's flag
        assert!(store.is_building());
    }
}
