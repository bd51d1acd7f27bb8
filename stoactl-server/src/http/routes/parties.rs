//! Banks, persons, equity partners and banking contacts.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use stoactl_core::finance::BankExposure;

use crate::db::repos::banks::{Bank, BankRepo};
use crate::db::repos::contacts::{BankingContact, ContactRepo};
use crate::db::repos::equity_partners::{EquityPartner, EquityPartnerRepo};
use crate::db::repos::persons::{Person, PersonRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{parse_id, ApiJson, ValidId};
use crate::http::response::{created, deleted, ok, ApiResult, Envelope};
use crate::http::server::AppState;
use crate::models::banking::ContactUpsert;
use crate::models::core_entities::{
    BankPatch, EquityPartnerPatch, NewBank, NewEquityPartner, NewPerson, PersonPatch,
};

type Created<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

// --- banks ---

async fn list_banks(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Bank>> {
    Ok(ok(BankRepo::new(&state.pool).list().await?))
}

async fn get_bank(State(state): State<Arc<AppState>>, ValidId(id): ValidId) -> ApiResult<Bank> {
    Ok(ok(BankRepo::new(&state.pool).get(id).await?))
}

async fn create_bank(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewBank>,
) -> Created<Bank> {
    Ok(created(BankRepo::new(&state.pool).create(body.validate()?).await?))
}

async fn update_bank(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<BankPatch>,
) -> ApiResult<Bank> {
    Ok(ok(BankRepo::new(&state.pool).update(id, body.validate()?).await?))
}

async fn delete_bank(State(state): State<Arc<AppState>>, ValidId(id): ValidId) -> ApiResult<Value> {
    BankRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("core.bank", id))
}

/// GET /banks/{id}/exposure - active participations only
async fn bank_exposure(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<BankExposure> {
    Ok(ok(BankRepo::new(&state.pool).exposure(id).await?))
}

// --- persons ---

async fn list_persons(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Person>> {
    Ok(ok(PersonRepo::new(&state.pool).list().await?))
}

async fn get_person(State(state): State<Arc<AppState>>, ValidId(id): ValidId) -> ApiResult<Person> {
    Ok(ok(PersonRepo::new(&state.pool).get(id).await?))
}

async fn create_person(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewPerson>,
) -> Created<Person> {
    Ok(created(PersonRepo::new(&state.pool).create(body.validate()?).await?))
}

async fn update_person(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<PersonPatch>,
) -> ApiResult<Person> {
    Ok(ok(PersonRepo::new(&state.pool).update(id, body.validate()?).await?))
}

async fn delete_person(State(state): State<Arc<AppState>>, ValidId(id): ValidId) -> ApiResult<Value> {
    PersonRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("core.person", id))
}

// --- equity partners ---

async fn list_partners(State(state): State<Arc<AppState>>) -> ApiResult<Vec<EquityPartner>> {
    Ok(ok(EquityPartnerRepo::new(&state.pool).list().await?))
}

async fn get_partner(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<EquityPartner> {
    Ok(ok(EquityPartnerRepo::new(&state.pool).get(id).await?))
}

async fn create_partner(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewEquityPartner>,
) -> Created<EquityPartner> {
    Ok(created(
        EquityPartnerRepo::new(&state.pool).create(body.validate()?).await?,
    ))
}

async fn update_partner(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<EquityPartnerPatch>,
) -> ApiResult<EquityPartner> {
    Ok(ok(EquityPartnerRepo::new(&state.pool)
        .update(id, body.validate()?)
        .await?))
}

async fn delete_partner(State(state): State<Arc<AppState>>, ValidId(id): ValidId) -> ApiResult<Value> {
    EquityPartnerRepo::new(&state.pool).delete(id).await?;
    Ok(deleted("core.equity_partner", id))
}

// --- banking contacts ---

async fn get_contact(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<String>,
) -> ApiResult<BankingContact> {
    let person_id = parse_id("personId", &person_id)?;
    Ok(ok(ContactRepo::new(&state.pool).get(person_id).await?))
}

/// PUT /contacts/{personId} - create or replace the banking extension
async fn upsert_contact(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<String>,
    ApiJson(body): ApiJson<ContactUpsert>,
) -> ApiResult<BankingContact> {
    let person_id = parse_id("personId", &person_id)?;
    Ok(ok(ContactRepo::new(&state.pool)
        .upsert(person_id, body.validate()?)
        .await?))
}

pub fn core_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/banks", get(list_banks).post(create_bank))
        .route("/banks/{id}", get(get_bank).put(update_bank).delete(delete_bank))
        .route("/persons", get(list_persons).post(create_person))
        .route(
            "/persons/{id}",
            get(get_person).put(update_person).delete(delete_person),
        )
        .route("/equity-partners", get(list_partners).post(create_partner))
        .route(
            "/equity-partners/{id}",
            get(get_partner).put(update_partner).delete(delete_partner),
        )
}

pub fn banking_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/banks/{id}/exposure", get(bank_exposure))
        .route("/contacts/{person_id}", get(get_contact).put(upsert_contact))
}
