//! Leasing datasets: keys, tolerant row access, fingerprints and KPIs.

pub mod dataset;
pub mod hash;
pub mod kpi;
pub mod row;
pub mod sync;

pub use dataset::DatasetKey;
pub use hash::{data_hash, etag_for, etag_matches, HASH_SAMPLE_ROWS};
pub use kpi::{compute_dashboard, Dashboard, DashboardInputs, KpiWindows, PortfolioKpi, PropertyKpi, UnitStatus};
pub use row::{RawRow, RowView};
pub use sync::{plan_chunks, ChunkPlan, SyncReport, CHUNK_ROWS};
