//! stoactl-server: HTTP API for the banking dashboard and leasing datasets
//!
//! Postgres-backed CRUD over the `core` and `banking` schemas, leasing
//! dataset ingestion (push or Domo pull) and a cached KPI dashboard.

pub mod db;
pub mod http;
pub mod leasing;
pub mod mail;
pub mod models;
pub mod reminders;
pub mod storage;

pub use db::{create_pool, DbError};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
