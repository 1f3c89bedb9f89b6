// Analytic query gateway repository - start, poll and read drive telemetry queries
use crate::application::polling::{poll_until_complete, QueryState, RetryPolicy};
use crate::application::repositories::TelemetrySource;
use crate::domain::telemetry::TelemetryRow;
use crate::infrastructure::http_client::{build_client, send_json, trim_base_url};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct QueryGatewayRepository {
    host: String,
    token: String,
    database: String,
    output_location: String,
    retry_policy: RetryPolicy,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartQueryRequest<'a> {
    query: String,
    database: &'a str,
    output_location: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartQueryResponse {
    execution_id: String,
}

#[derive(Debug, Deserialize)]
struct QueryStatusResponse {
    state: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryRowsResponse {
    #[serde(default)]
    rows: Vec<TelemetryRow>,
}

impl QueryGatewayRepository {
    pub fn new(
        host: String,
        token: String,
        database: String,
        output_location: String,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self {
            host: trim_base_url(&host),
            token,
            database,
            output_location,
            retry_policy,
            client: build_client()?,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        }
    }

    async fn start_query(&self, drive_id: &str) -> Result<String> {
        let body = StartQueryRequest {
            query: drive_query(drive_id),
            database: &self.database,
            output_location: &self.output_location,
        };
        let request = self
            .authorized(self.client.post(format!("{}/queries", self.host)))
            .json(&body);

        let started: StartQueryResponse = send_json(request, "query start").await?;
        Ok(started.execution_id)
    }

    async fn query_state(&self, execution_id: &str) -> Result<QueryState> {
        let url = format!("{}/queries/{}", self.host, urlencoding::encode(execution_id));
        let status: QueryStatusResponse =
            send_json(self.authorized(self.client.get(&url)), "query status").await?;
        Ok(parse_state(status))
    }

    async fn query_rows(&self, execution_id: &str) -> Result<Vec<TelemetryRow>> {
        let url = format!(
            "{}/queries/{}/rows",
            self.host,
            urlencoding::encode(execution_id)
        );
        let result: QueryRowsResponse =
            send_json(self.authorized(self.client.get(&url)), "query results").await?;
        Ok(result.rows)
    }
}

#[async_trait]
impl TelemetrySource for QueryGatewayRepository {
    async fn fetch_drive_telemetry(
        &self,
        drive_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TelemetryRow>> {
        let execution_id = self.start_query(drive_id).await?;
        tracing::debug!(drive_id, execution_id = %execution_id, "telemetry query started");

        let id = execution_id.as_str();
        poll_until_complete(&self.retry_policy, cancel, move || self.query_state(id))
            .await
            .with_context(|| format!("Telemetry query {} did not complete", execution_id))?;

        let rows = self.query_rows(&execution_id).await?;
        tracing::debug!(drive_id, rows = rows.len(), "telemetry rows fetched");
        Ok(rows)
    }
}

fn drive_query(drive_id: &str) -> String {
    format!(
        "SELECT * FROM drive WHERE driveId = '{}' ORDER BY time",
        drive_id.replace('\'', "''")
    )
}

fn parse_state(status: QueryStatusResponse) -> QueryState {
    match status.state.as_str() {
        "SUCCEEDED" => QueryState::Succeeded,
        "FAILED" => QueryState::Failed(status.reason.unwrap_or_else(|| "no reason given".to_string())),
        "CANCELLED" => QueryState::Cancelled,
        _ => QueryState::Pending,
    }
}
