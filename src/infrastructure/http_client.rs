// Shared helpers for the HTTP-backed collaborators
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Every call is bounded so a stalled collaborator cannot hold a worker forever
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("drive-analysis/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Turn a non-2xx response into an error carrying the body text
pub async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} failed with status {}: {}", what, status, body);
    }
    Ok(response)
}

pub async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder, what: &str) -> Result<T> {
    let response = request
        .header("Accept", "application/json")
        .send()
        .await
        .with_context(|| format!("Failed to send {}", what))?;

    ensure_success(response, what)
        .await?
        .json::<T>()
        .await
        .with_context(|| format!("Failed to parse {} response", what))
}

pub fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
