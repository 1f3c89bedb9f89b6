// Driving event domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One discrete event row from the relational event store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(alias = "eventTime")]
    pub timestamp: DateTime<Utc>,
    pub drive_id: String,
}

impl EventRecord {
    #[cfg(test)]
    pub fn new(event_type: &str, timestamp: DateTime<Utc>, drive_id: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            timestamp,
            drive_id: drive_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    SuddenAcceleration,
    SharpTurn,
    LaneDeparture,
    InactiveMoment,
    ReactionDelay,
    FollowingDistance,
}

impl EventCategory {
    /// Map a store category code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "RAPID_ACCELERATION" | "RAPID_DECELERATION" => Some(Self::SuddenAcceleration),
            "SHARP_TURN" => Some(Self::SharpTurn),
            "LANE_DEPARTURE" => Some(Self::LaneDeparture),
            "NO_OPERATION" => Some(Self::InactiveMoment),
            "REACTION_DELAY" => Some(Self::ReactionDelay),
            "FOLLOWING_DISTANCE" => Some(Self::FollowingDistance),
            _ => None,
        }
    }
}

/// Occurrences of one event type code, within a drive or across all of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeCount {
    #[serde(rename = "type")]
    pub event_type: String,
    pub count: u64,
}

/// Per-type counts keyed by drive id
pub type DriveEventCounts = BTreeMap<String, Vec<EventTypeCount>>;
