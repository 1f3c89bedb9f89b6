// Dashboard client - tells the dashboard service a drive has been analyzed
use crate::application::repositories::AnalysisNotifier;
use crate::domain::drive::Drive;
use crate::infrastructure::http_client::{build_client, ensure_success, trim_base_url};
use anyhow::{Context, Result};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct DashboardClient {
    host: String,
    client: reqwest::Client,
}

impl DashboardClient {
    pub fn new(host: String) -> Result<Self> {
        Ok(Self {
            host: trim_base_url(&host),
            client: build_client()?,
        })
    }
}

#[async_trait]
impl AnalysisNotifier for DashboardClient {
    async fn drive_analyzed(&self, drive: &Drive) -> Result<()> {
        let (user_id, drive_id) = drive
            .key()
            .context("Drive record is missing its user or drive id")?;
        let url = format!(
            "{}/dashboard/post-drive/{}",
            self.host,
            urlencoding::encode(drive_id)
        );

        let response = self
            .client
            .post(&url)
            .header("X-User-Id", user_id)
            .json(drive)
            .send()
            .await
            .context("Failed to send post-drive dashboard request")?;
        ensure_success(response, "post-drive dashboard").await?;

        tracing::debug!(user_id, drive_id, "dashboard notified");
        Ok(())
    }
}
