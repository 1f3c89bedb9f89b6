// Telemetry domain models
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

const NAIVE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Raw row as returned by the analytic query service, all columns as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    pub time: String,
    pub velocity: String,
    #[serde(rename = "driveid", default)]
    pub drive_id: String,
    #[serde(rename = "userid", default)]
    pub user_id: String,
}

impl TelemetryRow {
    #[cfg(test)]
    pub fn new(time: &str, velocity: &str, drive_id: &str, user_id: &str) -> Self {
        Self {
            time: time.to_string(),
            velocity: velocity.to_string(),
            drive_id: drive_id.to_string(),
            user_id: user_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub timestamp: DateTime<Utc>,
    pub velocity: f64,
}

impl TelemetrySample {
    /// Parse a row. Timestamps without an offset are read in `local_offset`.
    pub fn parse(row: &TelemetryRow, local_offset: FixedOffset) -> Result<Self, String> {
        let timestamp = parse_timestamp(&row.time, local_offset)?;
        let velocity = row
            .velocity
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("velocity {:?}: {}", row.velocity, e))?;
        if !velocity.is_finite() {
            return Err(format!("velocity {:?} is not finite", row.velocity));
        }
        Ok(Self {
            timestamp,
            velocity,
        })
    }
}

fn parse_timestamp(raw: &str, local_offset: FixedOffset) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, NAIVE_TIME_FORMAT)
        .map_err(|e| format!("timestamp {:?}: {}", raw, e))?;
    naive
        .and_local_timezone(local_offset)
        .single()
        .map(|time| time.with_timezone(&Utc))
        .ok_or_else(|| format!("timestamp {:?} is ambiguous", raw))
}
