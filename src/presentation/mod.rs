// Presentation layer - HTTP surface over the analysis service
pub mod app_state;
pub mod handlers;
pub mod router;
