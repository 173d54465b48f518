//! Request-path errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Postgres SQLSTATE for an exclusion constraint violation.
const EXCLUSION_VIOLATION: &str = "23P01";
/// Postgres SQLSTATE for a foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::validation(field, "missing field")
    }

    pub fn vehicle_unavailable() -> Self {
        AppError::Conflict("vehicle unavailable for requested dates".into())
    }

    /// Short machine-readable kind, used as the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Auth(_) => "auth_error",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::Store(_) => "store_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps constraint violations raised while inserting a booking onto domain errors.
    pub fn from_booking_insert(e: sqlx::Error) -> Self {
        let code = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|c| c.into_owned());
        match code.as_deref() {
            Some(EXCLUSION_VIOLATION) => Self::vehicle_unavailable(),
            Some(FOREIGN_KEY_VIOLATION) => AppError::NotFound("vehicle not found".into()),
            _ => AppError::Store(e),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation { field, message } => ErrorResponse {
                error: self.kind(),
                message: message.clone(),
                field: Some(*field),
            },
            AppError::Store(e) => {
                error!(error = %e, "store error");
                ErrorResponse {
                    error: self.kind(),
                    message: "storage failure".into(),
                    field: None,
                }
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "internal error");
                ErrorResponse {
                    error: self.kind(),
                    message: "unexpected error".into(),
                    field: None,
                }
            }
            other => {
                warn!(kind = other.kind(), message = %other, "request rejected");
                ErrorResponse {
                    error: other.kind(),
                    message: other.to_string(),
                    field: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}
