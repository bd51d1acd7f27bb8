//! Domo export and leasing sync push clients for stoactl.

pub mod client;
pub mod csv_rows;
pub mod error;
pub mod local;
pub mod push;

pub use client::DomoClient;
pub use csv_rows::parse_csv;
pub use error::{DomoError, Result};
pub use local::load_local_json;
pub use push::{DatasetPayload, PushClient, PushOptions};
