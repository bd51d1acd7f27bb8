//! Loan proceeds (draws), loan modifications and bank targets.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::Value;

use super::ListFilter;
use crate::db::repos::bank_targets::{BankTarget, BankTargetRepo};
use crate::db::repos::loan_activity::{LoanActivityRepo, LoanModification, LoanProceeds};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ValidId};
use crate::http::response::{created, deleted, ok, ApiResult, Envelope};
use crate::http::server::AppState;
use crate::models::banking::{
    BankTargetPatch, LoanModificationPatch, LoanProceedsPatch, NewBankTarget, NewLoanModification,
    NewLoanProceeds,
};

type Created<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

async fn list_proceeds(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<LoanProceeds>> {
    Ok(ok(LoanActivityRepo::new(&state.pool)
        .list_proceeds(filter.loan_id)
        .await?))
}

/// POST /loan-proceeds - project is taken from the loan
async fn create_proceeds(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewLoanProceeds>,
) -> Created<LoanProceeds> {
    Ok(created(
        LoanActivityRepo::new(&state.pool)
            .create_proceeds(body.validate()?)
            .await?,
    ))
}

async fn update_proceeds(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<LoanProceedsPatch>,
) -> ApiResult<LoanProceeds> {
    Ok(ok(LoanActivityRepo::new(&state.pool)
        .update_proceeds(id, body.validate()?)
        .await?))
}

async fn delete_proceeds(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    LoanActivityRepo::new(&state.pool).delete_proceeds(id).await?;
    Ok(deleted("banking.loan_proceeds", id))
}

async fn list_modifications(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<LoanModification>> {
    Ok(ok(LoanActivityRepo::new(&state.pool)
        .list_modifications(filter.loan_id)
        .await?))
}

async fn create_modification(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewLoanModification>,
) -> Created<LoanModification> {
    Ok(created(
        LoanActivityRepo::new(&state.pool)
            .create_modification(body.validate()?)
            .await?,
    ))
}

async fn update_modification(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<LoanModificationPatch>,
) -> ApiResult<LoanModification> {
    Ok(ok(LoanActivityRepo::new(&state.pool)
        .update_modification(id, body.validate()?)
        .await?))
}

async fn delete_modification(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    LoanActivityRepo::new(&state.pool).delete_modification(id).await?;
    Ok(deleted("banking.loan_modification", id))
}

async fn list_targets(State(state): State<Arc<AppState>>) -> ApiResult<Vec<BankTarget>> {
    Ok(ok(BankTargetRepo::new(&state.pool).list().await?))
}

async fn get_target(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<BankTarget> {
    Ok(ok(BankTargetRepo::new(&state.pool).get(id).await?))
}

async fn create_target(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewBankTarget>,
) -> Created<BankTarget> {
    Ok(created(
        BankTargetRepo::new(&state.pool).create(body.validate()?).await?,
    ))
}

async fn update_target(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<BankTargetPatch>,
) -> ApiResult<BankTarget> {
    Ok(ok(BankTargetRepo::new(&state.pool)
        .update(id, body.validate()?)
        .await?))
}

async fn delete_target(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    BankTargetRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("banking.bank_target", id))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/loan-proceeds", get(list_proceeds).post(create_proceeds))
        .route(
            "/loan-proceeds/{id}",
            put(update_proceeds).delete(delete_proceeds),
        )
        .route(
            "/loan-modifications",
            get(list_modifications).post(create_modification),
        )
        .route(
            "/loan-modifications/{id}",
            put(update_modification).delete(delete_modification),
        )
        .route("/bank-targets", get(list_targets).post(create_target))
        .route(
            "/bank-targets/{id}",
            get(get_target).put(update_target).delete(delete_target),
        )
}
