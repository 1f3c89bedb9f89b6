use crate::application::polling::RetryPolicy;
use crate::application::work_queue::WorkerConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub workers: WorkerSettings,
    #[serde(default)]
    pub analyzer: AnalyzerSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    pub query: QuerySettings,
    pub event_store: EndpointSettings,
    pub drive_store: EndpointSettings,
    /// Notification is skipped when absent
    pub dashboard: Option<EndpointSettings>,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkerSettings {
    pub count: usize,
    pub queue_capacity: usize,
    pub shutdown_grace_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            count: 20,
            queue_capacity: 1024,
            shutdown_grace_secs: 30,
        }
    }
}

impl WorkerSettings {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            workers: self.count,
            queue_capacity: self.queue_capacity,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalyzerSettings {
    /// Below this velocity a sample is idling, above it the sample is active
    pub idle_threshold: f64,
    pub window_secs: u32,
    pub low_band_max: f64,
    pub middle_band_max: f64,
    /// Offset applied to timestamps that carry no zone
    pub utc_offset_secs: i32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            idle_threshold: 1.0,
            window_secs: 20,
            low_band_max: 30.0,
            middle_band_max: 80.0,
            utc_offset_secs: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingSettings {
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub max_wait_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            multiplier: 2.0,
            max_delay_ms: 5000,
            max_wait_secs: 300,
        }
    }
}

impl PollingSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuerySettings {
    pub base_url: String,
    pub database: String,
    pub output_location: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointSettings {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Treat a drive without any recorded events as an error
    pub require_events: bool,
}

/// Load `config/analysis.*`, overridden by `DRIVE_ANALYSIS__SECTION__KEY`
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/analysis"))
        .add_source(
            config::Environment::with_prefix("DRIVE_ANALYSIS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
