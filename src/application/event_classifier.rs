// Event classifier - buckets discrete driving events by category
use crate::domain::drive::Drive;
use crate::domain::event::{EventCategory, EventRecord, EventTypeCount};
use std::collections::BTreeMap;

/// Split events into the six timestamp lists, keeping input order.
///
/// Every list is present in the result, even when empty. Unrecognized
/// codes are dropped so new event types can be added upstream first.
pub fn classify(events: &[EventRecord]) -> Drive {
    let mut sudden_accelerations = Vec::new();
    let mut sharp_turns = Vec::new();
    let mut lane_departures = Vec::new();
    let mut inactive_moments = Vec::new();
    let mut reaction_times = Vec::new();
    let mut following_distance_events = Vec::new();

    for event in events {
        let bucket = match EventCategory::from_code(&event.event_type) {
            Some(EventCategory::SuddenAcceleration) => &mut sudden_accelerations,
            Some(EventCategory::SharpTurn) => &mut sharp_turns,
            Some(EventCategory::LaneDeparture) => &mut lane_departures,
            Some(EventCategory::InactiveMoment) => &mut inactive_moments,
            Some(EventCategory::ReactionDelay) => &mut reaction_times,
            Some(EventCategory::FollowingDistance) => &mut following_distance_events,
            None => {
                tracing::trace!(event_type = %event.event_type, "skipping unrecognized event type");
                continue;
            }
        };
        bucket.push(event.timestamp);
    }

    Drive {
        sudden_accelerations: Some(sudden_accelerations),
        sharp_turns: Some(sharp_turns),
        lane_departures: Some(lane_departures),
        inactive_moments: Some(inactive_moments),
        reaction_times: Some(reaction_times),
        following_distance_events: Some(following_distance_events),
        ..Drive::default()
    }
}

/// Occurrences per raw type code, ordered by code
pub fn count_by_type(events: &[EventRecord]) -> Vec<EventTypeCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for event in events {
        *counts.entry(event.event_type.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(event_type, count)| EventTypeCount {
            event_type: event_type.to_string(),
            count,
        })
        .collect()
}
