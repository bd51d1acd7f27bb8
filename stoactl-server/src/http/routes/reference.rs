//! Lookup tables: regions, product types, loan types.
//!
//! All three share one handler set parameterized by [`ReferenceTable`].

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, put},
    Router,
};
use serde::Deserialize;

use crate::db::repos::reference::{
    ReferenceRepo, ReferenceTable, LOAN_TYPES, PRODUCT_TYPES, REGIONS,
};
use crate::http::extractors::{ApiJson, ValidId};
use crate::http::response::{created, ok};
use crate::http::server::AppState;
use crate::models::core_entities::{NewReferenceItem, ReferenceItemPatch};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    #[serde(default)]
    include_inactive: bool,
}

fn reference_routes(path: &str, table: ReferenceTable) -> Router<Arc<AppState>> {
    let collection = get(
        move |State(state): State<Arc<AppState>>, Query(params): Query<ListParams>| async move {
            let items = ReferenceRepo::new(&state.pool, table)
                .list(params.include_inactive)
                .await?;
            Ok::<_, crate::http::ApiError>(ok(items))
        },
    )
    .post(
        move |State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<NewReferenceItem>| async move {
            let item = ReferenceRepo::new(&state.pool, table)
                .create(body.validate()?)
                .await?;
            Ok::<_, crate::http::ApiError>(created(item))
        },
    );

    let member = put(
        move |State(state): State<Arc<AppState>>,
              ValidId(id): ValidId,
              ApiJson(body): ApiJson<ReferenceItemPatch>| async move {
            let item = ReferenceRepo::new(&state.pool, table)
                .update(id, body.validate()?)
                .await?;
            Ok::<_, crate::http::ApiError>(ok(item))
        },
    )
    .delete(
        move |State(state): State<Arc<AppState>>, ValidId(id): ValidId| async move {
            let item = ReferenceRepo::new(&state.pool, table).deactivate(id).await?;
            tracing::info!(table = table.table, id, "reference item deactivated");
            Ok::<_, crate::http::ApiError>(ok(item))
        },
    );

    Router::new()
        .route(path, collection)
        .route(&format!("{path}/{{id}}"), member)
}

pub fn core_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(reference_routes("/regions", REGIONS))
        .merge(reference_routes("/product-types", PRODUCT_TYPES))
}

pub fn banking_router() -> Router<Arc<AppState>> {
    reference_routes("/loan-types", LOAN_TYPES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_inactive_defaults_off() {
        let params: ListParams = serde_json::from_str("{}").unwrap();
        assert!(!params.include_inactive);
        let params: ListParams = serde_json::from_str(r#"{"includeInactive":true}"#).unwrap();
        assert!(params.include_inactive);
    }
}
