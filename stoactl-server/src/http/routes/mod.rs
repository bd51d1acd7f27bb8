//! Route handlers organized by resource

use std::sync::Arc;

use axum::Router;
use serde::Deserialize;

use super::server::AppState;

pub mod activity;
pub mod covenants;
pub mod equity;
pub mod files;
pub mod health;
pub mod leasing;
pub mod loans;
pub mod parties;
pub mod projects;
pub mod reference;
pub mod settings;

/// `?projectId=&loanId=` filters shared by the banking list endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    pub project_id: Option<i32>,
    pub loan_id: Option<i32>,
}

/// Everything under `/api/core`
pub fn core_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(projects::core_router())
        .merge(parties::core_router())
        .merge(reference::core_router())
}

/// Everything under `/api/banking`
pub fn banking_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(projects::banking_router())
        .merge(parties::banking_router())
        .merge(reference::banking_router())
        .merge(loans::router())
        .merge(covenants::router())
        .merge(equity::router())
        .merge(activity::router())
        .merge(files::router())
        .merge(settings::router())
}
