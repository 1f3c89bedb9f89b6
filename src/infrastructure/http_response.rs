// HTTP response utilities for analysis results and errors
use crate::application::work_queue::EnqueueError;
use crate::domain::error::AnalysisError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub fn status_for_analysis_error(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        AnalysisError::MalformedInput(_) | AnalysisError::NoActivity => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalysisError::NoData(_) => StatusCode::NOT_FOUND,
        AnalysisError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        AnalysisError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn status_for_enqueue_error(error: &EnqueueError) -> StatusCode {
    match error {
        EnqueueError::InvalidDriveId(_) => StatusCode::BAD_REQUEST,
        EnqueueError::Full | EnqueueError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn error_response(status: StatusCode, message: String) -> Response {
    if status.is_server_error() {
        tracing::error!(%status, "{}", message);
    } else {
        tracing::debug!(%status, "{}", message);
    }
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

pub fn analysis_error_response(error: AnalysisError) -> Response {
    error_response(status_for_analysis_error(&error), error.to_string())
}

pub fn enqueue_error_response(error: EnqueueError) -> Response {
    error_response(status_for_enqueue_error(&error), error.to_string())
}

/// 202 for a request handed to the worker pool
pub fn accepted_response(drive_id: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "message": format!("Drive analysis queued for {}", drive_id),
        })),
    )
        .into_response()
}
