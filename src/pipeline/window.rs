//! Daily time window gating.

use chrono::{DateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::error::{AppError, Result};
use crate::models::ScheduleConfig;

/// Allows runs only between two whole hours, inclusive, in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindowGate {
    start: NaiveTime,
    end: NaiveTime,
    tz: Tz,
}

impl TimeWindowGate {
    /// Create a gate for `[start_hour:00, end_hour:00]` in `tz`.
    pub fn new(start_hour: u32, end_hour: u32, tz: Tz) -> Result<Self> {
        let start = NaiveTime::from_hms_opt(start_hour, 0, 0)
            .ok_or_else(|| AppError::validation(format!("invalid start hour {start_hour}")))?;
        let end = NaiveTime::from_hms_opt(end_hour, 0, 0)
            .ok_or_else(|| AppError::validation(format!("invalid end hour {end_hour}")))?;
        Ok(Self { start, end, tz })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Self::new(config.start_hour, config.end_hour, config.tz()?)
    }

    /// Whether `now`, seen in the gate's timezone, falls inside the window.
    pub fn allowed<T: TimeZone>(&self, now: &DateTime<T>) -> bool {
        let local = now.with_timezone(&self.tz).time();
        self.start <= local && local <= self.end
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::America::Mexico_City;

    fn gate() -> TimeWindowGate {
        TimeWindowGate::new(5, 23, Mexico_City).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        Mexico_City
            .with_ymd_and_hms(2025, 3, 14, h, m, s)
            .single()
            .unwrap()
    }

    #[test]
    fn test_window_boundaries() {
        let gate = gate();
        assert!(!gate.allowed(&at(4, 59, 0)));
        assert!(gate.allowed(&at(5, 0, 0)));
        assert!(gate.allowed(&at(12, 30, 0)));
        assert!(gate.allowed(&at(23, 0, 0)));
        assert!(!gate.allowed(&at(23, 1, 0)));
    }

    #[test]
    fn test_end_is_exact_to_the_second() {
        assert!(!gate().allowed(&at(23, 0, 30)));
    }

    #[test]
    fn test_uses_gate_timezone_not_input_offset() {
        // 10:00 UTC is 04:00 in Mexico City (UTC-6)
        let utc = Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).single().unwrap();
        assert!(!gate().allowed(&utc));

        // 11:00 UTC is 05:00 in Mexico City
        let utc = Utc.with_ymd_and_hms(2025, 3, 14, 11, 0, 0).single().unwrap();
        assert!(gate().allowed(&utc));
    }

    #[test]
    fn test_invalid_hours_rejected() {
        assert!(TimeWindowGate::new(24, 23, Mexico_City).is_err());
        assert!(TimeWindowGate::new(5, 25, Mexico_City).is_err());
    }

    #[test]
    fn test_from_config_defaults() {
        let gate = TimeWindowGate::from_config(&ScheduleConfig::default()).unwrap();
        assert_eq!(gate.timezone(), Mexico_City);
    }
}
