//! stoactl-core: domain layer for the banking dashboard and leasing KPIs
//!
//! Nothing here touches the network or the database; the server and CLI
//! crates build on these types.

pub mod config;
pub mod email;
pub mod enums;
pub mod error;
pub mod finance;
pub mod leasing;
pub mod states;
pub mod validation;

pub use config::StoaConfig;
pub use error::{Result, StoaError};
pub use validation::ValidationError;
