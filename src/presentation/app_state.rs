// Application state for HTTP handlers
use crate::application::analysis_service::DriveAnalysisService;
use crate::application::work_queue::AnalysisQueue;

#[derive(Clone)]
pub struct AppState {
    pub analysis_service: DriveAnalysisService,
    pub analysis_queue: AnalysisQueue,
}
