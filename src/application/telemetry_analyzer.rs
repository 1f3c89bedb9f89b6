// Telemetry analyzer - single pass over a drive's ordered samples
use crate::domain::drive::{Drive, SpeedBand, SpeedLog, SpeedRate, TimeInterval};
use crate::domain::error::AnalysisError;
use crate::domain::telemetry::{TelemetryRow, TelemetrySample};
use crate::infrastructure::config::AnalyzerSettings;
use chrono::{DateTime, Duration, FixedOffset, Utc};

#[derive(Debug, Clone)]
pub struct TelemetryAnalyzer {
    settings: AnalyzerSettings,
    local_offset: FixedOffset,
}

impl TelemetryAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Result<Self, AnalysisError> {
        let local_offset = FixedOffset::east_opt(settings.utc_offset_secs).ok_or_else(|| {
            AnalysisError::InvalidArgument(format!(
                "utc offset {}s out of range",
                settings.utc_offset_secs
            ))
        })?;
        if settings.window_secs == 0 {
            return Err(AnalysisError::InvalidArgument(
                "speed log window must be at least one second".to_string(),
            ));
        }
        Ok(Self {
            settings,
            local_offset,
        })
    }

    /// Derive start/end, active duration, speed logs, idling periods and
    /// speed-band ratios. Event fields are left unset.
    ///
    /// Rows must already be sorted by time. A drive with no active samples
    /// gets no `speed_rate` rather than an error.
    pub fn analyze(&self, rows: &[TelemetryRow]) -> Result<Drive, AnalysisError> {
        let first_row = rows
            .first()
            .ok_or_else(|| AnalysisError::MalformedInput("no telemetry rows".to_string()))?;

        let mut idling = IdlingTracker::default();
        let mut bands = SpeedBandCounts::default();
        let mut windows: Option<SpeedWindows> = None;
        let mut first_timestamp: Option<DateTime<Utc>> = None;
        let mut last_timestamp: Option<DateTime<Utc>> = None;
        let mut active_samples: u32 = 0;

        for (index, row) in rows.iter().enumerate() {
            let sample = TelemetrySample::parse(row, self.local_offset)
                .map_err(|reason| AnalysisError::MalformedInput(format!("row {}: {}", index, reason)))?;

            if let Some(previous) = last_timestamp {
                if sample.timestamp < previous {
                    return Err(AnalysisError::MalformedInput(format!(
                        "row {}: timestamp {} is earlier than the previous row",
                        index, sample.timestamp
                    )));
                }
            }

            idling.observe(&sample, self.settings.idle_threshold);

            match windows.as_mut() {
                Some(w) => w.observe(&sample),
                None => {
                    windows = Some(SpeedWindows::new(
                        &sample,
                        Duration::seconds(i64::from(self.settings.window_secs)),
                    ))
                }
            }

            if sample.velocity > self.settings.idle_threshold {
                bands.record(self.band_of(sample.velocity));
                active_samples += 1;
            }

            first_timestamp.get_or_insert(sample.timestamp);
            last_timestamp = Some(sample.timestamp);
        }

        let speed_rate = match bands.ratios() {
            Ok(rates) => Some(rates),
            Err(AnalysisError::NoActivity) => {
                tracing::debug!(
                    drive_id = %first_row.drive_id,
                    "no active samples, leaving speed rate unset"
                );
                None
            }
            Err(e) => return Err(e),
        };

        let idling_periods = match last_timestamp {
            Some(end) => idling.finish(end),
            None => Vec::new(),
        };
        let speed_logs = windows.map(SpeedWindows::finish).unwrap_or_default();

        tracing::debug!(
            drive_id = %first_row.drive_id,
            samples = rows.len(),
            active_samples,
            idling_periods = idling_periods.len(),
            speed_logs = speed_logs.len(),
            "telemetry analyzed"
        );

        Ok(Drive {
            user_id: non_empty(&first_row.user_id),
            drive_id: non_empty(&first_row.drive_id),
            start_time: first_timestamp,
            end_time: last_timestamp,
            active_drive_duration_sec: Some(active_samples),
            speed_logs: Some(speed_logs),
            idling_periods: Some(idling_periods),
            speed_rate,
            ..Drive::default()
        })
    }

    fn band_of(&self, velocity: f64) -> SpeedBand {
        if velocity < self.settings.low_band_max {
            SpeedBand::Low
        } else if velocity < self.settings.middle_band_max {
            SpeedBand::Middle
        } else {
            SpeedBand::High
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Tracks maximal runs of samples below the idling threshold
#[derive(Debug, Default)]
struct IdlingTracker {
    started: Option<DateTime<Utc>>,
    periods: Vec<TimeInterval>,
}

impl IdlingTracker {
    fn observe(&mut self, sample: &TelemetrySample, threshold: f64) {
        if sample.velocity < threshold {
            self.started.get_or_insert(sample.timestamp);
        } else if let Some(start) = self.started.take() {
            self.close(start, sample.timestamp);
        }
    }

    fn finish(mut self, last: DateTime<Utc>) -> Vec<TimeInterval> {
        if let Some(start) = self.started.take() {
            self.close(start, last);
        }
        self.periods
    }

    // Zero-length runs (a trailing single idle sample) are not periods.
    fn close(&mut self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) {
        if start_time < end_time {
            self.periods.push(TimeInterval {
                start_time,
                end_time,
            });
        }
    }
}

/// Fixed-length windows holding the running maximum velocity. The open
/// window at the end of the drive is never emitted.
#[derive(Debug)]
struct SpeedWindows {
    length: Duration,
    started: DateTime<Utc>,
    current_max: f64,
    period: u32,
    logs: Vec<SpeedLog>,
}

impl SpeedWindows {
    fn new(first: &TelemetrySample, length: Duration) -> Self {
        Self {
            length,
            started: first.timestamp,
            current_max: first.velocity,
            period: 1,
            logs: Vec::new(),
        }
    }

    fn observe(&mut self, sample: &TelemetrySample) {
        if sample.timestamp - self.started < self.length {
            self.current_max = self.current_max.max(sample.velocity);
        } else {
            self.logs.push(SpeedLog {
                period: self.period,
                max_speed: self.current_max.floor() as i32,
            });
            self.period += 1;
            self.started = sample.timestamp;
            self.current_max = sample.velocity;
        }
    }

    fn finish(self) -> Vec<SpeedLog> {
        self.logs
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SpeedBandCounts {
    low: u32,
    middle: u32,
    high: u32,
}

impl SpeedBandCounts {
    fn record(&mut self, band: SpeedBand) {
        match band {
            SpeedBand::Low => self.low += 1,
            SpeedBand::Middle => self.middle += 1,
            SpeedBand::High => self.high += 1,
        }
    }

    /// Floor the low and middle shares; high takes the remainder so the
    /// three always add up to 100.
    fn ratios(&self) -> Result<Vec<SpeedRate>, AnalysisError> {
        let total = u64::from(self.low) + u64::from(self.middle) + u64::from(self.high);
        if total == 0 {
            return Err(AnalysisError::NoActivity);
        }

        let low = (100 * u64::from(self.low) / total) as u32;
        let middle = (100 * u64::from(self.middle) / total) as u32;
        let high = 100 - low - middle;

        Ok(vec![
            SpeedRate {
                tag: SpeedBand::Low,
                ratio: low,
            },
            SpeedRate {
                tag: SpeedBand::Middle,
                ratio: middle,
            },
            SpeedRate {
                tag: SpeedBand::High,
                ratio: high,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "2025-05-31T01:00:00Z";

    fn analyzer() -> TelemetryAnalyzer {
        TelemetryAnalyzer::new(AnalyzerSettings::default()).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(BASE).unwrap().with_timezone(&Utc) + Duration::seconds(secs)
    }

    fn row(secs: i64, velocity: f64) -> TelemetryRow {
        TelemetryRow::new(&at(secs).to_rfc3339(), &velocity.to_string(), "drive1", "user1")
    }

    fn rows(points: &[(i64, f64)]) -> Vec<TelemetryRow> {
        points.iter().map(|&(t, v)| row(t, v)).collect()
    }

    fn ratios(drive: &Drive) -> Vec<(SpeedBand, u32)> {
        drive
            .speed_rate
            .as_ref()
            .unwrap()
            .iter()
            .map(|r| (r.tag, r.ratio))
            .collect()
    }

    #[test]
    fn test_mixed_drive() {
        let drive = analyzer()
            .analyze(&rows(&[(0, 0.0), (30, 20.0), (60, 50.0), (120, 0.0)]))
            .unwrap();

        assert_eq!(drive.user_id.as_deref(), Some("user1"));
        assert_eq!(drive.drive_id.as_deref(), Some("drive1"));
        assert_eq!(drive.start_time, Some(at(0)));
        assert_eq!(drive.end_time, Some(at(120)));
        assert_eq!(drive.active_drive_duration_sec, Some(2));
        assert_eq!(
            drive.idling_periods,
            Some(vec![TimeInterval {
                start_time: at(0),
                end_time: at(30)
            }])
        );
        let logs: Vec<(u32, i32)> = drive
            .speed_logs
            .as_ref()
            .unwrap()
            .iter()
            .map(|l| (l.period, l.max_speed))
            .collect();
        assert_eq!(logs, vec![(1, 0), (2, 20), (3, 50)]);
        assert_eq!(
            ratios(&drive),
            vec![(SpeedBand::Low, 50), (SpeedBand::Middle, 50), (SpeedBand::High, 0)]
        );
        assert!(drive.sudden_accelerations.is_none());
        assert!(drive.following_distance_events.is_none());
    }

    #[test]
    fn test_naive_timestamps_use_configured_offset() {
        let settings = AnalyzerSettings {
            utc_offset_secs: 9 * 3600,
            ..AnalyzerSettings::default()
        };
        let data = vec![
            TelemetryRow::new("2025-05-31T01:00:00.000000", "0", "drive1", "user1"),
            TelemetryRow::new("2025-05-31T01:02:00.000000", "0", "drive1", "user1"),
        ];

        let drive = TelemetryAnalyzer::new(settings).unwrap().analyze(&data).unwrap();

        assert_eq!(drive.start_time.unwrap().to_rfc3339(), "2025-05-30T16:00:00+00:00");
        assert_eq!(drive.end_time.unwrap().to_rfc3339(), "2025-05-30T16:02:00+00:00");
    }

    #[test]
    fn test_all_idle_drive_has_no_speed_rate() {
        let drive = analyzer()
            .analyze(&rows(&[(0, 0.0), (60, 0.0), (120, 0.5)]))
            .unwrap();

        assert_eq!(drive.active_drive_duration_sec, Some(0));
        assert!(drive.speed_rate.is_none());
        assert_eq!(
            drive.idling_periods,
            Some(vec![TimeInterval {
                start_time: at(0),
                end_time: at(120)
            }])
        );
    }

    #[test]
    fn test_band_counts_raise_no_activity_when_empty() {
        assert!(matches!(
            SpeedBandCounts::default().ratios(),
            Err(AnalysisError::NoActivity)
        ));
    }

    #[test]
    fn test_high_speed_drive() {
        let drive = analyzer()
            .analyze(&rows(&[(0, 100.0), (60, 120.0), (120, 110.0)]))
            .unwrap();

        assert_eq!(drive.active_drive_duration_sec, Some(3));
        assert_eq!(drive.idling_periods, Some(vec![]));
        assert_eq!(
            ratios(&drive),
            vec![(SpeedBand::Low, 0), (SpeedBand::Middle, 0), (SpeedBand::High, 100)]
        );
    }

    #[test]
    fn test_ratio_remainder_goes_to_high() {
        let drive = analyzer()
            .analyze(&rows(&[(0, 10.0), (1, 50.0), (2, 90.0)]))
            .unwrap();

        assert_eq!(
            ratios(&drive),
            vec![(SpeedBand::Low, 33), (SpeedBand::Middle, 33), (SpeedBand::High, 34)]
        );
    }

    #[test]
    fn test_ratios_always_sum_to_100() {
        let velocities = [2.0, 29.9, 30.0, 79.9, 80.0, 150.0, 5.0];
        for n in 1..=velocities.len() {
            let data: Vec<TelemetryRow> = velocities[..n]
                .iter()
                .enumerate()
                .map(|(i, &v)| row(i as i64, v))
                .collect();

            let drive = analyzer().analyze(&data).unwrap();
            let rates = drive.speed_rate.unwrap();

            assert_eq!(rates.len(), 3);
            assert_eq!(rates.iter().map(|r| r.ratio).sum::<u32>(), 100);
            let tags: Vec<SpeedBand> = rates.iter().map(|r| r.tag).collect();
            assert_eq!(tags, vec![SpeedBand::Low, SpeedBand::Middle, SpeedBand::High]);
        }
    }

    #[test]
    fn test_band_boundaries() {
        // 30 is middle, 80 is high, exactly 1.0 is neither idle nor active
        let drive = analyzer()
            .analyze(&rows(&[(0, 30.0), (1, 80.0), (2, 1.0), (3, 29.99)]))
            .unwrap();

        assert_eq!(drive.active_drive_duration_sec, Some(3));
        assert_eq!(
            ratios(&drive),
            vec![(SpeedBand::Low, 33), (SpeedBand::Middle, 33), (SpeedBand::High, 34)]
        );
        assert_eq!(drive.idling_periods, Some(vec![]));
    }

    #[test]
    fn test_idling_runs_close_at_first_breaking_sample() {
        let drive = analyzer()
            .analyze(&rows(&[
                (0, 0.0),
                (1, 0.0),
                (2, 5.0),
                (3, 0.0),
                (4, 1.0),
                (5, 0.5),
                (6, 0.2),
                (7, 3.0),
            ]))
            .unwrap();

        let periods: Vec<(DateTime<Utc>, DateTime<Utc>)> = drive
            .idling_periods
            .unwrap()
            .iter()
            .map(|p| (p.start_time, p.end_time))
            .collect();
        assert_eq!(
            periods,
            vec![(at(0), at(2)), (at(3), at(4)), (at(5), at(7))]
        );
    }

    #[test]
    fn test_trailing_idle_run_closes_at_last_sample() {
        let drive = analyzer()
            .analyze(&rows(&[(0, 40.0), (10, 0.0), (20, 0.0), (30, 0.0)]))
            .unwrap();

        assert_eq!(
            drive.idling_periods,
            Some(vec![TimeInterval {
                start_time: at(10),
                end_time: at(30)
            }])
        );
    }

    #[test]
    fn test_trailing_window_is_discarded() {
        // 0..=50s every 5s: windows [0,20) and [20,40) close, [40,..) stays open
        let data: Vec<TelemetryRow> = (0..=10)
            .map(|i| row(i * 5, 10.5 + 2.0 * i as f64))
            .collect();

        let drive = analyzer().analyze(&data).unwrap();

        assert_eq!(
            drive.speed_logs,
            Some(vec![
                SpeedLog {
                    period: 1,
                    max_speed: 16
                },
                SpeedLog {
                    period: 2,
                    max_speed: 24
                },
            ])
        );
    }

    #[test]
    fn test_first_sample_counts_toward_first_window() {
        let drive = analyzer()
            .analyze(&rows(&[(0, 50.0), (5, 10.0), (10, 10.0), (20, 10.0), (25, 10.0)]))
            .unwrap();

        let logs: Vec<(u32, i32)> = drive
            .speed_logs
            .unwrap()
            .iter()
            .map(|l| (l.period, l.max_speed))
            .collect();
        assert_eq!(logs, vec![(1, 50)]);
    }

    #[test]
    fn test_single_sample() {
        let drive = analyzer().analyze(&rows(&[(0, 30.0)])).unwrap();

        assert_eq!(drive.start_time, drive.end_time);
        assert_eq!(drive.speed_logs, Some(vec![]));
        assert_eq!(drive.active_drive_duration_sec, Some(1));
        assert_eq!(
            ratios(&drive),
            vec![(SpeedBand::Low, 0), (SpeedBand::Middle, 100), (SpeedBand::High, 0)]
        );
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(matches!(
            analyzer().analyze(&[]),
            Err(AnalysisError::MalformedInput(_))
        ));

        let mut data = rows(&[(0, 10.0), (1, 20.0)]);
        data[1].velocity = "invalid".to_string();
        match analyzer().analyze(&data) {
            Err(AnalysisError::MalformedInput(msg)) => assert!(msg.starts_with("row 1")),
            other => panic!("expected malformed input, got {:?}", other),
        }

        let out_of_order = rows(&[(10, 10.0), (5, 20.0)]);
        assert!(matches!(
            analyzer().analyze(&out_of_order),
            Err(AnalysisError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_rejects_bad_settings() {
        let zero_window = AnalyzerSettings {
            window_secs: 0,
            ..AnalyzerSettings::default()
        };
        assert!(TelemetryAnalyzer::new(zero_window).is_err());

        let bad_offset = AnalyzerSettings {
            utc_offset_secs: 90_000,
            ..AnalyzerSettings::default()
        };
        assert!(TelemetryAnalyzer::new(bad_offset).is_err());
    }
}
