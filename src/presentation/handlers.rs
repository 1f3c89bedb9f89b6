// HTTP request handlers
use crate::domain::drive::Drive;
use crate::domain::event::{DriveEventCounts, EventTypeCount};
use crate::infrastructure::http_response::{
    accepted_response, analysis_error_response, enqueue_error_response,
};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

/// Event-derived view of one drive
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveEventsResponse {
    pub sudden_accelerations: Vec<chrono::DateTime<chrono::Utc>>,
    pub sharp_turns: Vec<chrono::DateTime<chrono::Utc>>,
    pub lane_departures: Vec<chrono::DateTime<chrono::Utc>>,
    pub inactive_moments: Vec<chrono::DateTime<chrono::Utc>>,
    pub reaction_times: Vec<chrono::DateTime<chrono::Utc>>,
    pub following_distance_events: Vec<chrono::DateTime<chrono::Utc>>,
}

impl From<Drive> for DriveEventsResponse {
    fn from(drive: Drive) -> Self {
        Self {
            sudden_accelerations: drive.sudden_accelerations.unwrap_or_default(),
            sharp_turns: drive.sharp_turns.unwrap_or_default(),
            lane_departures: drive.lane_departures.unwrap_or_default(),
            inactive_moments: drive.inactive_moments.unwrap_or_default(),
            reaction_times: drive.reaction_times.unwrap_or_default(),
            following_distance_events: drive.following_distance_events.unwrap_or_default(),
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Queue a drive for background analysis; returns before it runs
pub async fn request_analysis(
    Path(drive_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.analysis_queue.request_analysis(&drive_id) {
        Ok(()) => accepted_response(&drive_id),
        Err(e) => enqueue_error_response(e),
    }
}

/// Run the analysis inline without saving it
pub async fn preview_analysis(
    Path(drive_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.analysis_service.preview(&drive_id).await {
        Ok(drive) => Json(drive).into_response(),
        Err(e) => analysis_error_response(e),
    }
}

pub async fn drive_events(
    Path(drive_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.analysis_service.drive_events(&drive_id).await {
        Ok(drive) => Json(DriveEventsResponse::from(drive)).into_response(),
        Err(e) => analysis_error_response(e),
    }
}

/// Per-type event counts for one drive
pub async fn event_counts(
    Path(drive_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.analysis_service.event_counts(&drive_id).await {
        Ok(counts) => Json::<Vec<EventTypeCount>>(counts).into_response(),
        Err(e) => analysis_error_response(e),
    }
}

/// Per-type event counts across all drives
pub async fn event_totals(State(state): State<Arc<AppState>>) -> Response {
    match state.analysis_service.event_totals().await {
        Ok(counts) => Json::<Vec<EventTypeCount>>(counts).into_response(),
        Err(e) => analysis_error_response(e),
    }
}

/// Per-type event counts for a JSON array of drive ids
pub async fn drive_event_counts(
    State(state): State<Arc<AppState>>,
    Json(drive_ids): Json<Vec<String>>,
) -> Response {
    match state.analysis_service.event_counts_for_drives(&drive_ids).await {
        Ok(counts) => Json::<DriveEventCounts>(counts).into_response(),
        Err(e) => analysis_error_response(e),
    }
}
