// Drive document store client - overwrites the reconciled record per (user, drive)
use crate::application::repositories::DriveStore;
use crate::domain::drive::Drive;
use crate::infrastructure::http_client::{build_client, ensure_success, trim_base_url};
use anyhow::{Context, Result};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct DriveStoreClient {
    host: String,
    client: reqwest::Client,
}

impl DriveStoreClient {
    pub fn new(host: String) -> Result<Self> {
        Ok(Self {
            host: trim_base_url(&host),
            client: build_client()?,
        })
    }

    fn document_url(&self, user_id: &str, drive_id: &str) -> String {
        format!(
            "{}/drives/{}/{}",
            self.host,
            urlencoding::encode(user_id),
            urlencoding::encode(drive_id)
        )
    }
}

#[async_trait]
impl DriveStore for DriveStoreClient {
    async fn save(&self, drive: &Drive) -> Result<()> {
        let (user_id, drive_id) = drive
            .key()
            .context("Drive record is missing its user or drive id")?;

        let response = self
            .client
            .put(self.document_url(user_id, drive_id))
            .json(drive)
            .send()
            .await
            .context("Failed to send drive document")?;
        ensure_success(response, "drive save").await?;

        tracing::debug!(user_id, drive_id, "drive document written");
        Ok(())
    }
}
