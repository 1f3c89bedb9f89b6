// Domain layer - Drive records, telemetry rows, driving events
pub mod drive;
pub mod error;
pub mod event;
pub mod telemetry;
