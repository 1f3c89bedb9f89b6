// Route table for the analysis service
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    drive_event_counts, drive_events, event_counts, event_totals, health_check, preview_analysis,
    request_analysis,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/analysis/:drive_id", post(request_analysis))
        .route("/analysis/:drive_id/preview", get(preview_analysis))
        .route("/drive/:drive_id/events", get(drive_events))
        .route("/events", get(event_totals))
        .route("/events/drives", post(drive_event_counts))
        .route("/events/:drive_id", get(event_counts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
