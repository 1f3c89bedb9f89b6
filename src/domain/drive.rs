// Drive domain model - the reconciled per-drive record
use super::error::AnalysisError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_DRIVE_ID_LEN: usize = 64;

/// Per-drive aggregate keyed by `(user_id, drive_id)`.
///
/// Every field is optional: `None` means the source that produced this
/// instance did not compute it. An empty list is still a computed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_drive_duration_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sudden_accelerations: Option<Vec<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharp_turns: Option<Vec<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane_departures: Option<Vec<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive_moments: Option<Vec<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_logs: Option<Vec<SpeedLog>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idling_periods: Option<Vec<TimeInterval>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_rate: Option<Vec<SpeedRate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction_times: Option<Vec<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_distance_events: Option<Vec<DateTime<Utc>>>,
}

/// Maximum velocity seen in one fixed-length window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedLog {
    pub period: u32,
    pub max_speed: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedBand {
    Low,
    Middle,
    High,
}

/// Percentage of active samples spent in one band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedRate {
    pub tag: SpeedBand,
    pub ratio: u32,
}

impl Drive {
    /// Field-wise first-present-wins merge. Lists are taken whole from one
    /// side, never concatenated.
    pub fn merge(authoritative: Drive, fallback: Drive) -> Drive {
        // Destructured so a new field cannot be added without a merge rule.
        let Drive {
            user_id,
            drive_id,
            start_time,
            end_time,
            active_drive_duration_sec,
            sudden_accelerations,
            sharp_turns,
            lane_departures,
            inactive_moments,
            speed_logs,
            idling_periods,
            speed_rate,
            reaction_times,
            following_distance_events,
        } = authoritative;

        Drive {
            user_id: user_id.or(fallback.user_id),
            drive_id: drive_id.or(fallback.drive_id),
            start_time: start_time.or(fallback.start_time),
            end_time: end_time.or(fallback.end_time),
            active_drive_duration_sec: active_drive_duration_sec
                .or(fallback.active_drive_duration_sec),
            sudden_accelerations: sudden_accelerations.or(fallback.sudden_accelerations),
            sharp_turns: sharp_turns.or(fallback.sharp_turns),
            lane_departures: lane_departures.or(fallback.lane_departures),
            inactive_moments: inactive_moments.or(fallback.inactive_moments),
            speed_logs: speed_logs.or(fallback.speed_logs),
            idling_periods: idling_periods.or(fallback.idling_periods),
            speed_rate: speed_rate.or(fallback.speed_rate),
            reaction_times: reaction_times.or(fallback.reaction_times),
            following_distance_events: following_distance_events
                .or(fallback.following_distance_events),
        }
    }

    /// Composite document key, once both halves are known
    pub fn key(&self) -> Option<(&str, &str)> {
        match (&self.user_id, &self.drive_id) {
            (Some(user), Some(drive)) => Some((user.as_str(), drive.as_str())),
            _ => None,
        }
    }
}

/// Drive ids end up inside query text and URL paths, so only a
/// conservative character set is accepted.
pub fn validate_drive_id(drive_id: &str) -> Result<(), AnalysisError> {
    if drive_id.is_empty() {
        return Err(AnalysisError::InvalidArgument("drive id is empty".to_string()));
    }
    if drive_id.len() > MAX_DRIVE_ID_LEN {
        return Err(AnalysisError::InvalidArgument(format!(
            "drive id longer than {} characters",
            MAX_DRIVE_ID_LEN
        )));
    }
    if let Some(c) = drive_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(AnalysisError::InvalidArgument(format!(
            "drive id contains {:?}",
            c
        )));
    }
    Ok(())
}
