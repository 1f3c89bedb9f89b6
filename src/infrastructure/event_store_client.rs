// Event store client - reads discrete driving events over HTTP
use crate::application::repositories::EventStore;
use crate::domain::event::{DriveEventCounts, EventRecord, EventTypeCount};
use crate::infrastructure::http_client::{build_client, send_json, trim_base_url};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct EventStoreClient {
    host: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DriveCountsRequest<'a> {
    drive_ids: &'a [String],
}

impl EventStoreClient {
    pub fn new(host: String) -> Result<Self> {
        Ok(Self {
            host: trim_base_url(&host),
            client: build_client()?,
        })
    }

    fn events_url(&self, drive_id: &str) -> String {
        format!("{}/drives/{}/events", self.host, urlencoding::encode(drive_id))
    }

    fn counts_url(&self) -> String {
        format!("{}/events/counts", self.host)
    }

    fn drive_counts_url(&self) -> String {
        format!("{}/events/counts/by-drive", self.host)
    }
}

#[async_trait]
impl EventStore for EventStoreClient {
    async fn find_by_drive_id(&self, drive_id: &str) -> Result<Vec<EventRecord>> {
        let events: Vec<EventRecord> =
            send_json(self.client.get(self.events_url(drive_id)), "event lookup").await?;
        tracing::debug!(drive_id, events = events.len(), "events fetched");
        Ok(events)
    }

    async fn count_all_by_type(&self) -> Result<Vec<EventTypeCount>> {
        let mut counts: Vec<EventTypeCount> =
            send_json(self.client.get(self.counts_url()), "event totals").await?;
        counts.sort_by(|a, b| a.event_type.cmp(&b.event_type));
        Ok(counts)
    }

    async fn count_by_type_for_drives(&self, drive_ids: &[String]) -> Result<DriveEventCounts> {
        let request = self
            .client
            .post(self.drive_counts_url())
            .json(&DriveCountsRequest { drive_ids });
        let counts: DriveEventCounts = send_json(request, "event counts by drive").await?;
        tracing::debug!(drives = drive_ids.len(), found = counts.len(), "event counts fetched");
        Ok(counts)
    }
}
