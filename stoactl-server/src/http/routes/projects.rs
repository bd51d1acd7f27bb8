//! Projects, their capital stack and their attached files.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use stoactl_core::finance::CapitalStack;

use crate::db::repos::equity::EquityRepo;
use crate::db::repos::files::{BankingFile, FileRepo};
use crate::db::repos::projects::{Project, ProjectRepo};
use crate::db::repos::CascadeReport;
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ValidId};
use crate::http::response::{created, ok, ApiResult, Envelope};
use crate::http::server::AppState;
use crate::models::core_entities::{NewProject, ProjectPatch};
use crate::storage::object_key;

/// GET /projects
async fn list_projects(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Project>> {
    Ok(ok(ProjectRepo::new(&state.pool).list().await?))
}

/// GET /projects/{id}
async fn get_project(State(state): State<Arc<AppState>>, ValidId(id): ValidId) -> ApiResult<Project> {
    Ok(ok(ProjectRepo::new(&state.pool).get(id).await?))
}

/// POST /projects
async fn create_project(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewProject>,
) -> Result<(StatusCode, Json<Envelope<Project>>), ApiError> {
    let project = ProjectRepo::new(&state.pool).create(body.validate()?).await?;
    tracing::info!(project_id = project.project_id, "project created");
    Ok(created(project))
}

/// PUT /projects/{id}
async fn update_project(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    ApiJson(body): ApiJson<ProjectPatch>,
) -> ApiResult<Project> {
    Ok(ok(ProjectRepo::new(&state.pool).update(id, body.validate()?).await?))
}

/// DELETE /projects/{id} - cascades through every banking table
async fn delete_project(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<CascadeReport> {
    let report = ProjectRepo::new(&state.pool).delete_cascade(id).await?;
    tracing::info!(project_id = id, rows = report.total(), "project deleted");

    // rows are gone already; a failed blob delete only leaves an orphan
    for key in &report.storage_keys {
        if let Err(e) = state.files.delete(key).await {
            tracing::warn!(key = %key, error = %e, "failed to remove stored file");
        }
    }
    Ok(ok(report))
}

/// GET /projects/{id}/capital-stack
async fn capital_stack(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<CapitalStack> {
    Ok(ok(EquityRepo::new(&state.pool).capital_stack(id).await?))
}

/// GET /projects/{id}/files
async fn list_files(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Vec<BankingFile>> {
    ProjectRepo::new(&state.pool).get(id).await?;
    Ok(ok(FileRepo::new(&state.pool).list(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadParams {
    file_name: Option<String>,
}

/// POST /projects/{id}/files?fileName= - raw request body is the file
async fn upload_file(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Envelope<BankingFile>>), ApiError> {
    let file_name = params
        .file_name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("fileName query parameter is required"))?;
    if body.is_empty() {
        return Err(ApiError::bad_request("file body is empty"));
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    ProjectRepo::new(&state.pool).get(id).await?;

    let key = object_key(id, &file_name);
    let size = i64::try_from(body.len()).map_err(|_| ApiError::bad_request("file too large"))?;
    state.files.put(&key, body, content_type.as_deref()).await?;

    let record = FileRepo::new(&state.pool)
        .create(id, &file_name, content_type.as_deref(), &key, size)
        .await;
    match record {
        Ok(file) => {
            tracing::info!(project_id = id, file_id = file.banking_file_id, size, "file uploaded");
            Ok(created(file))
        }
        Err(e) => {
            if let Err(cleanup) = state.files.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "failed to remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

/// Project CRUD under `/api/core`
pub fn core_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
}

/// Project-scoped banking views under `/api/banking`
pub fn banking_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/{id}/capital-stack", get(capital_stack))
        .route("/projects/{id}/files", get(list_files).post(upload_file))
}
