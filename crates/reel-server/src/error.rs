//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::StatusEnvelope;
use crate::db::DbError;
use crate::features::imports::commands::SubmitError;
use crate::features::movies::ListMoviesError;
use crate::ingest::status_store::StatusStoreError;

/// Application error types
///
/// Every variant renders as `{"status": "error", "message": ...}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "Database error");
                "A database error occurred".to_string()
            },
            AppError::Internal(ref message) => {
                tracing::error!(error = %message, "Internal error");
                message.clone()
            },
            other => other.to_string(),
        };

        (status, Json(StatusEnvelope::error(message))).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => AppError::NotFound(msg),
            DbError::Sqlx(err) => AppError::Database(err),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<StatusStoreError> for AppError {
    fn from(err: StatusStoreError) -> Self {
        match err {
            StatusStoreError::NotFound(_) => AppError::NotFound("Task not found".to_string()),
            StatusStoreError::Database(err) => AppError::Database(err),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            // Missing source files are a 400, not a 404.
            SubmitError::Validation(msg) | SubmitError::FileNotFound(msg) => AppError::Validation(msg),
            SubmitError::Enqueue(e) => AppError::Internal(format!("Failed to enqueue job: {}", e)),
            SubmitError::Storage(e) => AppError::Internal(format!("Failed to record job: {}", e)),
        }
    }
}

impl From<ListMoviesError> for AppError {
    fn from(err: ListMoviesError) -> Self {
        match err {
            ListMoviesError::Database(e) => AppError::Database(e),
        }
    }
}

/// Alias for Result with AppError
pub type ApiResult<T> = Result<T, AppError>;
