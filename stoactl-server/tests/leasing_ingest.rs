//! Dataset replacement against a real database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use serde_json::json;
use sqlx::PgPool;
use stoactl_core::config::LeasingSection;
use stoactl_core::leasing::{DatasetKey, RawRow};
use stoactl_server::db::migrations;
use stoactl_server::db::repos::leasing::{LeasingRepo, SyncSource};
use stoactl_server::leasing::ingest::IngestOutcome;
use stoactl_server::leasing::Ingestor;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = stoactl_server::create_pool(&url).await.unwrap();
    migrations::run(&pool).await.unwrap();
    pool
}

/// Rows no earlier run can have produced, so the first replace always lands.
fn fresh_rows(n: usize) -> Vec<RawRow> {
    let run = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    (0..n)
        .map(|i| {
            json!({"Property": "Ingest Court", "Unit": format!("{run}-{i}"), "MarketRent": 1500 + i})
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

#[tokio::test]
#[ignore = "requires database"]
async fn identical_payload_is_skipped_as_unchanged() {
    let pool = pool().await;
    let ingestor = Ingestor::new(pool.clone(), &LeasingSection::default());
    let rows = fresh_rows(3);

    let first = ingestor
        .replace(DatasetKey::Pricing, &rows, SyncSource::Push)
        .await
        .unwrap();
    assert_eq!(first, IngestOutcome::Synced { rows: 3 });

    let second = ingestor
        .replace(DatasetKey::Pricing, &rows, SyncSource::Push)
        .await
        .unwrap();
    assert_eq!(second, IngestOutcome::Skipped { reason: "unchanged" });

    // The skip leaves the last successful sync in place
    let last = LeasingRepo::new(&pool)
        .last_success(DatasetKey::Pricing)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.row_count, 3);

    let changed = fresh_rows(2);
    let third = ingestor
        .replace(DatasetKey::Pricing, &changed, SyncSource::Push)
        .await
        .unwrap();
    assert_eq!(third, IngestOutcome::Synced { rows: 2 });
}
