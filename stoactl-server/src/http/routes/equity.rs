//! Equity commitments and their related parties.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde_json::Value;

use super::ListFilter;
use crate::db::repos::equity::{EquityCommitment, EquityRepo, RelatedParty};
use crate::http::error::ApiError;
use crate::http::extractors::{parse_id, ApiJson, ValidId};
use crate::http::response::{created, deleted, ok, ApiResult, Envelope};
use crate::http::server::AppState;
use crate::models::banking::{EquityCommitmentPatch, NewEquityCommitment, NewRelatedParty};
use crate::models::ValidationError;

type Created<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

async fn list_commitments(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<EquityCommitment>> {
    Ok(ok(EquityRepo::new(&state.pool).list(filter.project_id).await?))
}

async fn get_commitment(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<EquityCommitment> {
    Ok(ok(EquityRepo::new(&state.pool).get(id).await?))
}

async fn create_commitment(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewEquityCommitment>,
) -> Created<EquityCommitment> {
    Ok(created(EquityRepo::new(&state.pool).create(body.validate()?).await?))
}

async fn update_commitment(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<EquityCommitmentPatch>,
) -> ApiResult<EquityCommitment> {
    Ok(ok(EquityRepo::new(&state.pool)
        .update(id, body.validate()?)
        .await?))
}

async fn delete_commitment(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    EquityRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("banking.equity_commitment", id))
}

async fn list_related(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Vec<RelatedParty>> {
    Ok(ok(EquityRepo::new(&state.pool).related_parties(id).await?))
}

/// POST /equity-commitments/{id}/related-parties - idempotent; returns the full list
async fn add_related(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<NewRelatedParty>,
) -> Created<Vec<RelatedParty>> {
    let party_id = body.related_party_id.ok_or(ValidationError::Missing {
        field: "RelatedPartyId",
    })?;
    Ok(created(
        EquityRepo::new(&state.pool)
            .add_related_party(id, party_id)
            .await?,
    ))
}

async fn remove_related(
    State(state): State<Arc<AppState>>,
    Path((id, party_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let id = parse_id("id", &id)?;
    let party_id = parse_id("partyId", &party_id)?;
    EquityRepo::new(&state.pool)
        .remove_related_party(id, party_id)
        .await?;
    Ok(deleted(
        "banking.equity_commitment_related_party",
        format!("{id}/{party_id}"),
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/equity-commitments",
            get(list_commitments).post(create_commitment),
        )
        .route(
            "/equity-commitments/{id}",
            get(get_commitment)
                .put(update_commitment)
                .delete(delete_commitment),
        )
        .route(
            "/equity-commitments/{id}/related-parties",
            get(list_related).post(add_related),
        )
        .route(
            "/equity-commitments/{id}/related-parties/{party_id}",
            delete(remove_related),
        )
}
