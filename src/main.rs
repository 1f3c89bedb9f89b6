// Main entry point - Dependency injection, worker pool and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use crate::application::analysis_service::DriveAnalysisService;
use crate::application::telemetry_analyzer::TelemetryAnalyzer;
use crate::application::work_queue::WorkerPool;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::dashboard_client::DashboardClient;
use crate::infrastructure::drive_store_client::DriveStoreClient;
use crate::infrastructure::event_store_client::EventStoreClient;
use crate::infrastructure::query_gateway_repository::QueryGatewayRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create collaborators (infrastructure layer)
    let telemetry = Arc::new(QueryGatewayRepository::new(
        config.query.base_url,
        config.query.token,
        config.query.database,
        config.query.output_location,
        config.polling.retry_policy(),
    )?);
    let events = Arc::new(EventStoreClient::new(config.event_store.base_url)?);
    let drives = Arc::new(DriveStoreClient::new(config.drive_store.base_url)?);

    // Create services (application layer)
    let analyzer = TelemetryAnalyzer::new(config.analyzer)?;
    let mut analysis_service = DriveAnalysisService::new(telemetry, events, drives, analyzer)
        .require_events(config.analysis.require_events);
    if let Some(dashboard) = config.dashboard {
        analysis_service =
            analysis_service.with_notifier(Arc::new(DashboardClient::new(dashboard.base_url)?));
    }

    // Start the worker pool once for the process lifetime
    let pool = WorkerPool::start(
        Arc::new(analysis_service.clone()),
        config.workers.worker_config(),
    );

    // Create application state
    let state = Arc::new(AppState {
        analysis_service,
        analysis_queue: pool.queue(),
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, "starting drive-analysis service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain queued analyses before exiting
    pool.shutdown(Duration::from_secs(config.workers.shutdown_grace_secs))
        .await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
