// Application layer - Use cases and ports
pub mod analysis_service;
pub mod event_classifier;
pub mod polling;
pub mod repositories;
pub mod telemetry_analyzer;
pub mod work_queue;

#[cfg(test)]
pub mod test_support;
