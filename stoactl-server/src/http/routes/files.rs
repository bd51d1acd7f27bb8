//! Download and delete of stored banking files.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Router,
};
use serde_json::Value;

use crate::db::repos::files::FileRepo;
use crate::http::error::ApiError;
use crate::http::extractors::ValidId;
use crate::http::response::{deleted, ApiResult};
use crate::http::server::AppState;

/// `attachment; filename="..."` with quotes and control characters stripped.
fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// GET /files/{id}/download
async fn download(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Response, ApiError> {
    let file = FileRepo::new(&state.pool).get(id).await?;
    let bytes = state.files.get(&file.storage_key).await?;

    let content_type = file
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition(&file.file_name)),
        ],
        bytes,
    )
        .into_response())
}

/// DELETE /files/{id} - row first, then the blob
async fn delete_file(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> ApiResult<Value> {
    let key = FileRepo::new(&state.pool).delete(id).await?;
    if let Err(e) = state.files.delete(&key).await {
        tracing::warn!(file_id = id, key = %key, error = %e, "failed to remove stored file");
    }
    Ok(deleted("banking.banking_file", id))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/files/{id}/download", get(download))
        .route("/files/{id}", delete(delete_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_strips_quotes() {
        let value = content_disposition("loan \"final\".pdf");
        assert_eq!(value.to_str().unwrap(), "attachment; filename=\"loan final.pdf\"");
    }

    #[test]
    fn disposition_replaces_non_ascii() {
        let value = content_disposition("résumé.pdf");
        assert_eq!(value.to_str().unwrap(), "attachment; filename=\"r_sum_.pdf\"");
    }
}
