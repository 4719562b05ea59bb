// service/schedule.rs
// Cadence bookkeeping for the monitoring loop.

use crate::config::Settings;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// Fires when `every` has elapsed since the last completed run.
#[derive(Debug, Clone)]
pub struct Cadence {
    every: Duration,
    last: Option<DateTime<Utc>>,
}

impl Cadence {
    pub fn every_seconds(seconds: u64) -> Self {
        Self {
            every: Duration::seconds(seconds as i64),
            last: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.last.map_or(true, |last| now - last >= self.every)
    }

    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last = Some(now);
    }
}

/// Fires once per UTC day, at or after the configured time.
#[derive(Debug, Clone)]
pub struct DailyGate {
    at: NaiveTime,
    last_sent: Option<NaiveDate>,
}

impl DailyGate {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            at: NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0).unwrap_or(NaiveTime::MIN),
            last_sent: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now.time() >= self.at && self.last_sent != Some(now.date_naive())
    }

    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_sent = Some(now.date_naive());
    }
}

#[derive(Debug, Clone)]
pub struct CycleSchedule {
    pub market: Cadence,
    pub economic: Cadence,
    pub fed: Cadence,
    pub cleanup: Cadence,
    pub newsletter: DailyGate,
}

impl CycleSchedule {
    pub fn from_settings(settings: &Settings) -> Self {
        let s = &settings.schedule;
        Self {
            market: Cadence::every_seconds(s.market_data_seconds),
            economic: Cadence::every_seconds(s.economic_data_seconds),
            fed: Cadence::every_seconds(s.fed_speeches_seconds),
            cleanup: Cadence::every_seconds(s.cleanup_seconds),
            newsletter: DailyGate::new(settings.newsletter.send_hour, settings.newsletter.send_minute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cadence() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        let mut cadence = Cadence::every_seconds(300);
        assert!(cadence.is_due(t0));
        cadence.mark(t0);
        assert!(!cadence.is_due(t0 + Duration::seconds(299)));
        assert!(cadence.is_due(t0 + Duration::seconds(300)));
    }

    #[test]
    fn test_daily_gate_once_per_day() {
        let mut gate = DailyGate::new(13, 0);
        let morning = Utc.with_ymd_and_hms(2025, 1, 10, 12, 59, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2025, 1, 10, 13, 1, 0).unwrap();
        assert!(!gate.is_due(morning));
        assert!(gate.is_due(afternoon));

        gate.mark(afternoon);
        assert!(!gate.is_due(afternoon + Duration::hours(3)));
        assert!(gate.is_due(afternoon + Duration::days(1)));
    }
}
