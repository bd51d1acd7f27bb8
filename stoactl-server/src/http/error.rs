//! API error type with IntoResponse.
//!
//! Every failure renders as `{ "success": false, "error": { "message": ... } }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use stoactl_core::ValidationError;

use crate::db::DbError;
use crate::leasing::LeasingError;
use crate::storage::StorageError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Malformed request or bad reference (400)
    BadRequest { message: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Duplicate, still referenced, or job already running (409)
    Conflict { message: String },

    /// Domo or blob storage failed (502)
    Upstream { message: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::BadRequest { message } | Self::Conflict { message } | Self::Upstream { message } => {
                message.clone()
            }
            Self::NotFound { resource, id } => format!("{resource} '{id}' not found"),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                "an internal error occurred".to_owned()
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                "an internal error occurred".to_owned()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "success": false,
            "error": { "message": self.message() }
        });
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Invalid(v) => Self::Validation(v),
            DbError::MissingReference { .. } => Self::bad_request("referenced record does not exist"),
            DbError::CheckFailed { constraint } => {
                Self::bad_request(format!("value violates {constraint}"))
            }
            DbError::Referenced { .. } => Self::Conflict {
                message: "record is referenced by other records".into(),
            },
            DbError::Duplicate { constraint } => Self::Conflict {
                message: format!("a record with the same value already exists ({constraint})"),
            },
            DbError::Sqlx(_) => Self::Database(e),
        }
    }
}

impl From<LeasingError> for ApiError {
    fn from(e: LeasingError) -> Self {
        match e {
            LeasingError::Busy(job) => Self::Conflict {
                message: format!("{job} already in progress"),
            },
            LeasingError::NotConfigured => Self::bad_request(e.to_string()),
            LeasingError::Domo(inner) => {
                tracing::warn!(error = %inner, "Domo request failed");
                Self::Upstream {
                    message: format!("Domo request failed: {inner}"),
                }
            }
            LeasingError::Db(db) => db.into(),
            LeasingError::Serialize(err) => Self::Internal {
                message: err.to_string(),
            },
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(key) => Self::NotFound {
                resource: "stored file",
                id: key,
            },
            StorageError::InvalidKey { .. } => Self::bad_request(e.to_string()),
            StorageError::Http(_) | StorageError::Status { .. } => {
                tracing::error!(error = %e, "blob storage request failed");
                Self::Upstream {
                    message: "file storage is unavailable".into(),
                }
            }
            StorageError::Io(_) => Self::Internal {
                message: e.to_string(),
            },
        }
    }
}
