//! Covenants, reminder dispatch, DSCR tests and liquidity requirements.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use stoactl_core::ValidationError;

use super::ListFilter;
use crate::db::repos::covenants::{Covenant, CovenantRepo};
use crate::db::repos::dscr_tests::{DscrTest, DscrTestRepo};
use crate::db::repos::liquidity::{LiquidityRepo, LiquidityRequirement};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ValidId};
use crate::http::response::{created, deleted, ok, ApiResult, Envelope};
use crate::http::server::AppState;
use crate::models::banking::{
    CovenantPatch, DscrTestPatch, LiquidityRequirementPatch, NewCovenant, NewDscrTest,
    NewLiquidityRequirement,
};
use crate::reminders::{send_due_reminders, ReminderReport};

type Created<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

async fn list_covenants(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<Covenant>> {
    Ok(ok(CovenantRepo::new(&state.pool)
        .list(filter.project_id, filter.loan_id)
        .await?))
}

async fn get_covenant(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Covenant> {
    Ok(ok(CovenantRepo::new(&state.pool).get(id).await?))
}

async fn create_covenant(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewCovenant>,
) -> Created<Covenant> {
    Ok(created(
        CovenantRepo::new(&state.pool).create(body.validate()?).await?,
    ))
}

async fn update_covenant(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<CovenantPatch>,
) -> ApiResult<Covenant> {
    Ok(ok(CovenantRepo::new(&state.pool)
        .update(id, body.validate()?)
        .await?))
}

async fn delete_covenant(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    CovenantRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("banking.covenant", id))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReminderParams {
    as_of: Option<String>,
}

fn parse_as_of(raw: Option<&str>) -> Result<NaiveDate, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Utc::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            ApiError::from(ValidationError::invalid_format("asOf", "expected YYYY-MM-DD"))
        }),
    }
}

/// POST /covenants/send-reminders?asOf=YYYY-MM-DD
async fn send_reminders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReminderParams>,
) -> ApiResult<ReminderReport> {
    let as_of = parse_as_of(params.as_of.as_deref())?;
    let report =
        send_due_reminders(&state.pool, state.mailer.as_ref(), &state.reminders, as_of).await?;
    tracing::info!(
        %as_of,
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        "covenant reminders processed"
    );
    Ok(ok(report))
}

// --- DSCR tests ---

async fn list_dscr_tests(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<DscrTest>> {
    Ok(ok(DscrTestRepo::new(&state.pool)
        .list(filter.project_id, filter.loan_id)
        .await?))
}

async fn get_dscr_test(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<DscrTest> {
    Ok(ok(DscrTestRepo::new(&state.pool).get(id).await?))
}

async fn create_dscr_test(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewDscrTest>,
) -> Created<DscrTest> {
    Ok(created(
        DscrTestRepo::new(&state.pool).create(body.validate()?).await?,
    ))
}

async fn update_dscr_test(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<DscrTestPatch>,
) -> ApiResult<DscrTest> {
    Ok(ok(DscrTestRepo::new(&state.pool)
        .update(id, body.validate()?)
        .await?))
}

async fn delete_dscr_test(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    DscrTestRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("banking.dscr_test", id))
}

// --- liquidity requirements ---

async fn list_liquidity(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Vec<LiquidityRequirement>> {
    Ok(ok(LiquidityRepo::new(&state.pool)
        .list(filter.project_id, filter.loan_id)
        .await?))
}

async fn get_liquidity(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<LiquidityRequirement> {
    Ok(ok(LiquidityRepo::new(&state.pool).get(id).await?))
}

async fn create_liquidity(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewLiquidityRequirement>,
) -> Created<LiquidityRequirement> {
    Ok(created(
        LiquidityRepo::new(&state.pool).create(body.validate()?).await?,
    ))
}

async fn update_liquidity(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<LiquidityRequirementPatch>,
) -> ApiResult<LiquidityRequirement> {
    Ok(ok(LiquidityRepo::new(&state.pool)
        .update(id, body.validate()?)
        .await?))
}

async fn delete_liquidity(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    LiquidityRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("banking.liquidity_requirement", id))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/covenants", get(list_covenants).post(create_covenant))
        .route("/covenants/send-reminders", post(send_reminders))
        .route(
            "/covenants/{id}",
            get(get_covenant).put(update_covenant).delete(delete_covenant),
        )
        .route("/dscr-tests", get(list_dscr_tests).post(create_dscr_test))
        .route(
            "/dscr-tests/{id}",
            get(get_dscr_test).put(update_dscr_test).delete(delete_dscr_test),
        )
        .route(
            "/liquidity-requirements",
            get(list_liquidity).post(create_liquidity),
        )
        .route(
            "/liquidity-requirements/{id}",
            get(get_liquidity).put(update_liquidity).delete(delete_liquidity),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_of_defaults_to_today_and_rejects_garbage() {
        assert_eq!(parse_as_of(None).unwrap(), Utc::now().date_naive());
        assert_eq!(
            parse_as_of(Some("2024-09-30")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
        );
        assert!(parse_as_of(Some("09/30/2024")).is_err());
    }
}
