//! Database layer - connection pool, migrations and repositories
//!
//! - Connection pool (default 5 connections)
//! - Rely on DB constraints and map SQLSTATEs, no check-then-insert
//! - Transactions for multi-step writes and cascades

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repos;
pub mod update;

pub use error::{DbError, OrNotFound};
pub use pool::{create_pool, create_pool_with_options, DEFAULT_MAX_CONNECTIONS};
pub use sqlx::PgPool;
