//! Resolves wall-clock time to a `Phase` using a configured schedule.

use chrono::{Datelike, NaiveTime, Timelike, Utc, Weekday};
use serde::Deserialize;

use crate::models::phase::Phase;

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInterval {
    pub start: String,
    pub end: String,
    pub phase: String,
}

#[derive(Debug, Clone)]
pub struct PhaseManager {
    schedule: Vec<(NaiveTime, NaiveTime, Phase)>,
}

impl PhaseManager {
    pub fn default_schedule() -> Self {
        let t = |h: u32, m: u32, s: u32| NaiveTime::from_hms_opt(h, m, s).expect("static time literal");
        Self {
            schedule: vec![
                (t(8, 0, 0), t(9, 29, 30), Phase::PreOpen),
                (t(9, 29, 30), t(9, 30, 0), Phase::OpeningAuction),
                (t(9, 30, 0), t(16, 0, 0), Phase::Continuous),
            ],
        }
    }

    pub fn from_intervals(intervals: &[ScheduleInterval]) -> anyhow::Result<Self> {
        let mut schedule = Vec::with_capacity(intervals.len());
        for interval in intervals {
            let start = NaiveTime::parse_from_str(&interval.start, "%H:%M:%S")?;
            let end = NaiveTime::parse_from_str(&interval.end, "%H:%M:%S")?;
            let phase = match interval.phase.as_str() {
                "pre_open" => Phase::PreOpen,
                "opening_auction" => Phase::OpeningAuction,
                "continuous" => Phase::Continuous,
                other => anyhow::bail!("unknown phase in schedule: {other}"),
            };
            schedule.push((start, end, phase));
        }
        Ok(Self { schedule })
    }

    /// Resolve the phase for `now`. Falls back to `closed` outside every
    /// configured interval and on weekends.
    pub fn phase_at(&self, now: chrono::DateTime<Utc>) -> Phase {
        if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return Phase::Closed;
        }
        let time = NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second())
            .expect("hour/minute/second from a valid DateTime are always valid");
        for (start, end, phase) in &self.schedule {
            if time >= *start && time < *end {
                return *phase;
            }
        }
        Phase::Closed
    }

    pub fn current_phase(&self) -> Phase {
        self.phase_at(Utc::now())
    }
}

impl Default for PhaseManager {
    fn default() -> Self {
        Self::default_schedule()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32, second: u32) -> chrono::DateTime<Utc> {
        // 2026-08-03 is a Monday.
        Utc.with_ymd_and_hms(2026, 8, 3, hour, minute, second).unwrap()
    }

    #[test]
    fn resolves_each_named_interval() {
        let manager = PhaseManager::default_schedule();
        assert_eq!(manager.phase_at(at(7, 59, 0)), Phase::Closed);
        assert_eq!(manager.phase_at(at(8, 0, 0)), Phase::PreOpen);
        assert_eq!(manager.phase_at(at(9, 29, 30)), Phase::OpeningAuction);
        assert_eq!(manager.phase_at(at(9, 30, 0)), Phase::Continuous);
        assert_eq!(manager.phase_at(at(16, 0, 0)), Phase::Closed);
    }

    #[test]
    fn weekend_is_always_closed() {
        let manager = PhaseManager::default_schedule();
        let saturday = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        assert_eq!(manager.phase_at(saturday), Phase::Closed);
    }
}
