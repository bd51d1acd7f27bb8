//! Leasing ingestion, sync status and the precomputed dashboard.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use stoactl_core::leasing::sync::{
    parse_flag, HEADER_DATA_HASH, HEADER_FIRST_CHUNK, HEADER_LAST_CHUNK, HEADER_TOTAL_ROWS,
};
use stoactl_core::leasing::{etag_matches, DatasetKey, PropertyKpi, SyncReport};

use crate::db::repos::leasing::SyncLogEntry;
use crate::http::error::ApiError;
use crate::http::extractors::ApiJson;
use crate::http::response::{ok, ApiResult};
use crate::http::server::AppState;
use crate::leasing::{ChunkInfo, DomoSyncOptions, Snapshot};
use crate::models::{Paginated, Pagination, PaginationParams};

/// Response header carrying the snapshot build time.
const HEADER_BUILT_AT: &str = "x-snapshot-built-at";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map_err(|_| ApiError::bad_request(format!("{name} is not valid text")))
        })
        .transpose()
}

fn header_flag(headers: &HeaderMap, name: &str) -> Result<Option<bool>, ApiError> {
    header_str(headers, name)?
        .map(|raw| {
            parse_flag(raw).ok_or_else(|| ApiError::bad_request(format!("{name} must be true or false")))
        })
        .transpose()
}

/// Read the chunk headers. `None` when the request is not chunked.
fn chunk_from_headers(headers: &HeaderMap) -> Result<Option<ChunkInfo>, ApiError> {
    let first = header_flag(headers, HEADER_FIRST_CHUNK)?;
    let last = header_flag(headers, HEADER_LAST_CHUNK)?;
    if first.is_none() && last.is_none() {
        return Ok(None);
    }

    let total_rows = header_str(headers, HEADER_TOTAL_ROWS)?
        .map(|raw| {
            raw.trim()
                .parse::<usize>()
                .map_err(|_| ApiError::bad_request(format!("{HEADER_TOTAL_ROWS} must be a row count")))
        })
        .transpose()?;
    let data_hash = header_str(headers, HEADER_DATA_HASH)?
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_owned);

    Ok(Some(ChunkInfo {
        first: first.unwrap_or(false),
        last: last.unwrap_or(false),
        total_rows,
        data_hash,
    }))
}

/// POST /sync - push one or more datasets, optionally chunked
///
/// Responds with the bare sync report; per-dataset failures are listed in
/// `errors` and do not change the status code.
async fn sync(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> Result<Json<SyncReport>, ApiError> {
    let chunk = chunk_from_headers(&headers)?;
    if chunk.is_some() && body.len() != 1 {
        return Err(ApiError::bad_request(
            "chunked uploads must carry exactly one dataset",
        ));
    }
    if body.is_empty() {
        return Err(ApiError::bad_request("no datasets in request body"));
    }

    let report = state.leasing.push(body, chunk.as_ref()).await;
    tracing::info!(
        synced = report.synced.len(),
        skipped = report.skipped.len(),
        success = report.success,
        "leasing push handled"
    );
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
struct DomoParams {
    #[serde(default)]
    force: bool,
    dataset: Option<String>,
}

fn parse_dataset(raw: &str) -> Result<DatasetKey, ApiError> {
    DatasetKey::from_str(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

/// POST /sync-from-domo?force=true&dataset=KEY
async fn sync_from_domo(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DomoParams>,
) -> Result<Json<SyncReport>, ApiError> {
    let only = params.dataset.as_deref().map(parse_dataset).transpose()?;
    let options = DomoSyncOptions {
        force: params.force,
        only,
    };
    let report = state.leasing.sync_from_domo(options).await?;
    Ok(Json(report))
}

/// GET /sync-status - newest log entry per dataset
async fn sync_status(State(state): State<Arc<AppState>>) -> ApiResult<Vec<SyncLogEntry>> {
    Ok(ok(state.leasing.repo().latest_per_dataset().await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetParams {
    property: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

/// GET /datasets/{key}?property=&page=&perPage=
async fn dataset_rows(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<DatasetParams>,
) -> ApiResult<Paginated<Value>> {
    let key = parse_dataset(&key)?;
    let page = Pagination::from(PaginationParams {
        page: params.page,
        per_page: params.per_page,
    });
    let property = params.property.as_deref().map(str::trim).filter(|p| !p.is_empty());
    Ok(ok(state.leasing.repo().rows(key, property, page).await?))
}

fn with_snapshot_headers(mut response: Response, snapshot: &Snapshot) -> Response {
    let headers = response.headers_mut();
    if let Ok(etag) = HeaderValue::from_str(&snapshot.etag) {
        headers.insert(header::ETAG, etag);
    }
    if let Ok(built_at) = HeaderValue::from_str(&snapshot.built_at.to_rfc3339()) {
        headers.insert(HEADER_BUILT_AT, built_at);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// GET /dashboard - conditional on `If-None-Match`
async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let snapshot = state.leasing.snapshots().current().await?;

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|inm| etag_matches(inm, &snapshot.etag));
    if not_modified {
        return Ok(with_snapshot_headers(
            StatusCode::NOT_MODIFIED.into_response(),
            &snapshot,
        ));
    }

    let body = ok(&snapshot.dashboard).into_response();
    Ok(with_snapshot_headers(body, &snapshot))
}

/// GET /dashboard/properties/{property}
async fn dashboard_property(
    State(state): State<Arc<AppState>>,
    Path(property): Path<String>,
) -> ApiResult<PropertyKpi> {
    let snapshot = state.leasing.snapshots().current().await?;
    snapshot
        .dashboard
        .property(&property)
        .cloned()
        .map(ok)
        .ok_or(ApiError::NotFound {
            resource: "property",
            id: property,
        })
}

/// POST /dashboard/rebuild - 409 while another rebuild runs
async fn rebuild(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let snapshot = state.leasing.snapshots().rebuild().await?;
    let body = ok(&snapshot.dashboard).into_response();
    Ok(with_snapshot_headers(body, &snapshot))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync", post(sync))
        .route("/sync-from-domo", post(sync_from_domo))
        .route("/sync-status", get(sync_status))
        .route("/datasets/{key}", get(dataset_rows))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/properties/{property}", get(dashboard_property))
        .route("/dashboard/rebuild", post(rebuild))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn no_chunk_headers_means_whole_dataset() {
        assert_eq!(chunk_from_headers(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn last_chunk_carries_totals() {
        let chunk = chunk_from_headers(&headers(&[
            (HEADER_FIRST_CHUNK, "false"),
            (HEADER_LAST_CHUNK, "true"),
            (HEADER_TOTAL_ROWS, "12001"),
            (HEADER_DATA_HASH, "abc123"),
        ]))
        .unwrap()
        .unwrap();
        assert!(!chunk.first);
        assert!(chunk.last);
        assert_eq!(chunk.total_rows, Some(12_001));
        assert_eq!(chunk.data_hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn bad_chunk_headers_are_rejected() {
        assert!(chunk_from_headers(&headers(&[(HEADER_FIRST_CHUNK, "maybe")])).is_err());
        assert!(chunk_from_headers(&headers(&[
            (HEADER_LAST_CHUNK, "true"),
            (HEADER_TOTAL_ROWS, "lots"),
        ]))
        .is_err());
    }

    #[test]
    fn dataset_keys_parse_case_insensitively() {
        let key = DatasetKey::ALL[0];
        assert_eq!(parse_dataset(&key.as_str().to_uppercase()).unwrap(), key);
        assert!(parse_dataset("nope").is_err());
    }
}
