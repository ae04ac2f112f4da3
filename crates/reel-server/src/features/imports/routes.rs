//! Import routes
//!
//! - `POST /convert` - queue a CSV file for import

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::commands::{submit, SubmissionGateway, SubmitImportCommand};
use crate::api::response::StatusEnvelope;
use crate::error::{ApiResult, AppError};

pub fn imports_routes() -> Router<SubmissionGateway> {
    Router::new().route("/convert", post(convert))
}

/// Queue a file for import
///
/// # Request Body
///
/// ```json
/// { "name": "ratings.csv", "table": "ratings" }
/// ```
///
/// # Response
///
/// - `202 Accepted` - `{"status": "success", "message": "File is being processed", "job_id": "..."}`
/// - `400 Bad Request` - missing fields, bad file name, or file not present
/// - `500 Internal Server Error` - queue or status store unavailable
async fn convert(
    State(gateway): State<SubmissionGateway>,
    body: Result<Json<SubmitImportCommand>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(command) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected import request body");
        AppError::Validation("Invalid request body".to_string())
    })?;

    let response = submit::handle(&gateway, command).await?;

    Ok((StatusCode::ACCEPTED, Json(StatusEnvelope::accepted(response.job_id))).into_response())
}
