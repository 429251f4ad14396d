//! Decides whether an attendance session is currently live.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use crate::common::{AttendanceError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionActivity {
    Active,
    Inactive,
}

impl SessionActivity {
    pub fn is_active(self) -> bool {
        self == SessionActivity::Active
    }
}

/// Calendar day plus an inclusive minute range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            date,
            start: truncate_to_minute(start),
            end: truncate_to_minute(end),
        }
    }

    /// Parses `"YYYY-MM-DD"`, `"HH:MM"`, `"HH:MM"`.
    pub fn parse(date: &str, start: &str, end: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|_| AttendanceError::InvalidInput(format!("date must be YYYY-MM-DD, got '{}'", date)))?;
        let start_time = parse_time(start)?;
        let end_time = parse_time(end)?;

        if end_time < start_time {
            return Err(AttendanceError::InvalidInput(format!(
                "session ends ({}) before it starts ({})", end, start
            )));
        }

        Ok(Self::new(date, start_time, end_time))
    }

    pub fn activity(&self, now: NaiveDateTime) -> SessionActivity {
        let time = truncate_to_minute(now.time());
        if now.date() == self.date && self.start <= time && time <= self.end {
            SessionActivity::Active
        } else {
            SessionActivity::Inactive
        }
    }

    pub fn activity_now(&self) -> SessionActivity {
        self.activity(Local::now().naive_local())
    }

    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn start_string(&self) -> String {
        self.start.format(TIME_FORMAT).to_string()
    }

    pub fn end_string(&self) -> String {
        self.end.format(TIME_FORMAT).to_string()
    }
}

pub fn can_check_in(window: &SessionWindow, now: NaiveDateTime) -> bool {
    window.activity(now).is_active()
}

pub fn can_view_reference_face(window: &SessionWindow, now: NaiveDateTime) -> bool {
    window.activity(now).is_active()
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| AttendanceError::InvalidInput(format!("time must be HH:MM, got '{}'", value)))
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn window() -> SessionWindow {
        SessionWindow::parse("2025-09-13", "11:33", "12:33").unwrap()
    }

    #[test]
    fn active_inside_window() {
        assert!(can_check_in(&window(), at("2025-09-13", "12:00:00")));
        assert!(can_view_reference_face(&window(), at("2025-09-13", "12:00:00")));
    }

    #[test]
    fn inactive_after_end_minute() {
        assert!(!can_check_in(&window(), at("2025-09-13", "12:34:00")));
    }

    #[test]
    fn inactive_on_another_day() {
        assert!(!can_check_in(&window(), at("2025-09-14", "12:00:00")));
        assert!(!can_check_in(&window(), at("2025-09-12", "12:00:00")));
    }

    #[test]
    fn bounds_are_inclusive_to_the_minute() {
        assert!(can_check_in(&window(), at("2025-09-13", "11:33:00")));
        assert!(can_check_in(&window(), at("2025-09-13", "12:33:59")));
        assert!(!can_check_in(&window(), at("2025-09-13", "11:32:59")));
    }

    #[test]
    fn both_capabilities_agree() {
        for time in ["11:00:00", "11:33:00", "12:10:30", "12:33:00", "13:00:00"] {
            let now = at("2025-09-13", time);
            assert_eq!(can_check_in(&window(), now), can_view_reference_face(&window(), now));
        }
    }

    #[test]
    fn parse_rejects_malformed_values() {
        assert!(matches!(
            SessionWindow::parse("13/09/2025", "11:33", "12:33"),
            Err(AttendanceError::InvalidInput(_))
        ));
        assert!(matches!(
            SessionWindow::parse("2025-09-13", "25:00", "12:33"),
            Err(AttendanceError::InvalidInput(_))
        ));
        assert!(matches!(
            SessionWindow::parse("2025-09-13", "12:33", "11:33"),
            Err(AttendanceError::InvalidInput(_))
        ));
    }

    #[test]
    fn formats_round_trip_to_strings() {
        let w = window();
        assert_eq!(w.date_string(), "2025-09-13");
        assert_eq!(w.start_string(), "11:33");
        assert_eq!(w.end_string(), "12:33");
    }
}
