//! Loans, participations, guarantees and guarantee burndowns.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use stoactl_core::finance::months_to_maturity;

use super::ListFilter;
use crate::db::repos::guarantees::{Burndown, Guarantee, GuaranteeRepo};
use crate::db::repos::loans::{Loan, LoanRepo};
use crate::db::repos::participations::{Participation, ParticipationRepo};
use crate::db::repos::CascadeReport;
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ValidId};
use crate::http::response::{created, deleted, ok, ApiResult, Envelope};
use crate::http::server::AppState;
use crate::models::banking::{
    BurndownPatch, GuaranteePatch, LoanPatch, NewBurndown, NewGuarantee, NewLoan, NewParticipation,
    ParticipationPatch,
};

type Created<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

/// Loan row plus the derived months to maturity
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub months_to_maturity: Option<i32>,
}

impl LoanView {
    pub fn new(loan: Loan, today: NaiveDate) -> Self {
        Self {
            months_to_maturity: months_to_maturity(loan.maturity_date, today),
            loan,
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// --- loans ---

async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<LoanView>> {
    let today = today();
    let loans = LoanRepo::new(&state.pool).list(filter.project_id).await?;
    Ok(ok(loans.into_iter().map(|l| LoanView::new(l, today)).collect()))
}

async fn get_loan(State(state): State<Arc<AppState>>, ValidId(id): ValidId) -> ApiResult<LoanView> {
    let loan = LoanRepo::new(&state.pool).get(id).await?;
    Ok(ok(LoanView::new(loan, today())))
}

/// POST /loans - also creates the DSCR/Occupancy covenants the terms imply
async fn create_loan(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewLoan>,
) -> Created<LoanView> {
    let loan = LoanRepo::new(&state.pool).create(body.validate()?).await?;
    tracing::info!(loan_id = loan.loan_id, project_id = loan.project_id, "loan created");
    Ok(created(LoanView::new(loan, today())))
}

async fn update_loan(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<LoanPatch>,
) -> ApiResult<LoanView> {
    let loan = LoanRepo::new(&state.pool).update(id, body.validate()?).await?;
    Ok(ok(LoanView::new(loan, today())))
}

async fn delete_loan(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<CascadeReport> {
    let report = LoanRepo::new(&state.pool).delete_cascade(id).await?;
    tracing::info!(loan_id = id, rows = report.total(), "loan deleted");
    Ok(ok(report))
}

// --- participations ---

async fn list_participations(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<Participation>> {
    Ok(ok(ParticipationRepo::new(&state.pool).list(filter.loan_id).await?))
}

async fn get_participation(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Participation> {
    Ok(ok(ParticipationRepo::new(&state.pool).get(id).await?))
}

async fn create_participation(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewParticipation>,
) -> Created<Participation> {
    Ok(created(
        ParticipationRepo::new(&state.pool).create(body.validate()?).await?,
    ))
}

async fn update_participation(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<ParticipationPatch>,
) -> ApiResult<Participation> {
    Ok(ok(ParticipationRepo::new(&state.pool)
        .update(id, body.validate()?)
        .await?))
}

async fn delete_participation(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    ParticipationRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("banking.participation", id))
}

// --- guarantees ---

async fn list_guarantees(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<Guarantee>> {
    Ok(ok(GuaranteeRepo::new(&state.pool)
        .list(filter.project_id, filter.loan_id)
        .await?))
}

async fn get_guarantee(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Guarantee> {
    Ok(ok(GuaranteeRepo::new(&state.pool).get(id).await?))
}

async fn create_guarantee(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewGuarantee>,
) -> Created<Guarantee> {
    Ok(created(
        GuaranteeRepo::new(&state.pool).create(body.validate()?).await?,
    ))
}

async fn update_guarantee(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<GuaranteePatch>,
) -> ApiResult<Guarantee> {
    Ok(ok(GuaranteeRepo::new(&state.pool)
        .update(id, body.validate()?)
        .await?))
}

async fn delete_guarantee(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    GuaranteeRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("banking.guarantee", id))
}

async fn list_burndowns(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Vec<Burndown>> {
    Ok(ok(GuaranteeRepo::new(&state.pool).burndowns(id).await?))
}

async fn create_burndown(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<NewBurndown>,
) -> Created<Burndown> {
    Ok(created(
        GuaranteeRepo::new(&state.pool)
            .create_burndown(id, body.validate()?)
            .await?,
    ))
}

async fn update_burndown(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<BurndownPatch>,
) -> ApiResult<Burndown> {
    Ok(ok(GuaranteeRepo::new(&state.pool)
        .update_burndown(id, body.validate()?)
        .await?))
}

async fn delete_burndown(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    GuaranteeRepo::new(&state.pool).delete_burndown(id).await?;
    Ok(deleted("banking.guarantee_burndown", id))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/{id}", get(get_loan).put(update_loan).delete(delete_loan))
        .route(
            "/participations",
            get(list_participations).post(create_participation),
        )
        .route(
            "/participations/{id}",
            get(get_participation)
                .put(update_participation)
                .delete(delete_participation),
        )
        .route("/guarantees", get(list_guarantees).post(create_guarantee))
        .route(
            "/guarantees/{id}",
            get(get_guarantee).put(update_guarantee).delete(delete_guarantee),
        )
        .route(
            "/guarantees/{id}/burndowns",
            get(list_burndowns).post(create_burndown),
        )
        .route(
            "/guarantee-burndowns/{id}",
            put(update_burndown).delete(delete_burndown),
        )
}
