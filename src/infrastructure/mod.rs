// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod dashboard_client;
pub mod drive_store_client;
pub mod event_store_client;
pub mod http_client;
pub mod http_response;
pub mod query_gateway_repository;
