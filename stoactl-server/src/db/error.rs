//! Database error classification.
//!
//! Constraint violations are pulled out of `sqlx::Error` by SQLSTATE so the
//! HTTP layer can answer 400/409 instead of 500.

use stoactl_core::ValidationError;
use thiserror::Error;

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// Insert/update pointed at a row that does not exist
    #[error("referenced record does not exist ({constraint})")]
    MissingReference { constraint: String },

    /// Delete blocked by rows that still point here
    #[error("record is referenced by other records ({constraint})")]
    Referenced { constraint: String },

    #[error("duplicate value violates {constraint}")]
    Duplicate { constraint: String },

    #[error("value violates {constraint}")]
    CheckFailed { constraint: String },

    /// Request-shaped problem discovered at the repository (e.g. empty update)
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl DbError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Reinterpret a foreign-key failure raised by a DELETE.
    pub fn on_delete(self) -> Self {
        match self {
            Self::MissingReference { constraint } => Self::Referenced { constraint },
            other => other,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            let constraint = db.constraint().unwrap_or("constraint").to_owned();
            match db.code().as_deref() {
                Some(FOREIGN_KEY_VIOLATION) => return Self::MissingReference { constraint },
                Some(UNIQUE_VIOLATION) => return Self::Duplicate { constraint },
                Some(CHECK_VIOLATION) => return Self::CheckFailed { constraint },
                _ => {}
            }
        }
        Self::Sqlx(e)
    }
}

/// Shorthand for `fetch_optional(..)?.ok_or_else(not_found)`.
pub trait OrNotFound<T> {
    fn or_not_found(self, resource: &'static str, id: impl ToString) -> Result<T, DbError>;
}

impl<T> OrNotFound<T> for Option<T> {
    fn or_not_found(self, resource: &'static str, id: impl ToString) -> Result<T, DbError> {
        self.ok_or_else(|| DbError::not_found(resource, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_reinterprets_foreign_key() {
        let err = DbError::MissingReference {
            constraint: "fk_loan_project".into(),
        }
        .on_delete();
        assert!(matches!(err, DbError::Referenced { .. }));
    }

    #[test]
    fn non_database_errors_pass_through() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Sqlx(_)));
    }

    #[test]
    fn or_not_found_names_resource() {
        let missing: Option<i32> = None;
        let err = missing.or_not_found("loan", 7).unwrap_err();
        assert_eq!(err.to_string(), "not found: loan '7'");
    }
}
