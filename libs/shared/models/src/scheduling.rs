//! Typed scheduling model shared by the schedule store, the booking ledger and
//! the availability engine.
//!
//! All times are wall-clock local times. No timezone conversion happens
//! anywhere in the engine.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DAYS_PER_WEEK: u8 = 7;

pub const WEEKDAY_NAMES: [&str; 7] = [
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

/// Monday=0 .. Sunday=6 for a calendar date.
///
/// Calendar libraries commonly count from Sunday=0; the portal counts from
/// Monday=0, hence `(calendar + 6) % 7`.
pub fn system_weekday(date: NaiveDate) -> u8 {
    let calendar_weekday = date.weekday().num_days_from_sunday();
    ((calendar_weekday + 6) % 7) as u8
}

/// Resolves a day name ("Monday", "mon") or a Monday=0 number ("0") to a weekday index.
pub fn weekday_from_name(raw: &str) -> Option<u8> {
    let name = raw.trim().to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    if let Ok(number) = name.parse::<u8>() {
        return (number < DAYS_PER_WEEK).then_some(number);
    }
    WEEKDAY_NAMES
        .iter()
        .position(|day| *day == name || (name.len() >= 3 && day.starts_with(name.as_str())))
        .map(|index| index as u8)
}

/// Parses a wall-clock time as stored by the portal: "HH:MM", "HH:MM:SS" or a bare hour ("9").
pub fn parse_wall_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains(':') {
        return NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok();
    }
    raw.parse::<u32>()
        .ok()
        .and_then(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
}

pub fn format_wall_clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Serde adapter rendering `NaiveTime` as "HH:MM".
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_wall_clock(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_wall_clock(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid wall-clock time '{}'", raw)))
    }
}

/// A practitioner's recurring hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyRule {
    pub weekday: u8,
    pub is_available: bool,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl WeeklyRule {
    pub fn new(weekday: u8, is_available: bool, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self { weekday, is_available, start_time, end_time }
    }

    /// The entry used when storage has nothing for a weekday: closed, default hours.
    pub fn closed(weekday: u8, default_start: NaiveTime, default_end: NaiveTime) -> Self {
        Self::new(weekday, false, default_start, default_end)
    }

    pub fn has_valid_window(&self) -> bool {
        self.start_time < self.end_time
    }

    pub fn day_name(&self) -> &'static str {
        WEEKDAY_NAMES
            .get(self.weekday as usize)
            .copied()
            .unwrap_or("unknown")
    }
}

/// A one-off override of a single calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleException {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub date: NaiveDate,
    pub is_available: bool,
    #[serde(default)]
    pub reason: String,
}

/// Per-practitioner booking limits. Owned by profile management; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLimit {
    pub daily_patient_limit: Option<u32>,
    pub accepting_appointments: bool,
}

impl Default for CapacityLimit {
    fn default() -> Self {
        Self {
            daily_patient_limit: None,
            accepting_appointments: true,
        }
    }
}

impl CapacityLimit {
    pub fn is_exhausted(&self, scheduled_count: usize) -> bool {
        self.daily_patient_limit
            .map(|limit| scheduled_count >= limit as usize)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    pub fn scheduled(
        practitioner_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            practitioner_id,
            patient_id,
            date,
            time: truncate_to_minute(time),
            status: AppointmentStatus::Scheduled,
            created_at,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    /// Whether this appointment occupies the given start time.
    pub fn occupies(&self, time: NaiveTime) -> bool {
        self.is_scheduled() && truncate_to_minute(self.time) == truncate_to_minute(time)
    }
}

pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_system_weekday_is_monday_based() {
        // 2024-01-01 was a Monday
        assert_eq!(system_weekday(date(2024, 1, 1)), 0);
        assert_eq!(system_weekday(date(2024, 1, 3)), 2);
        assert_eq!(system_weekday(date(2024, 1, 6)), 5);
        assert_eq!(system_weekday(date(2024, 1, 7)), 6);
    }

    #[test]
    fn test_system_weekday_matches_chrono_monday_numbering() {
        let mut day = date(2024, 2, 20);
        for _ in 0..14 {
            assert_eq!(system_weekday(day) as u32, day.weekday().num_days_from_monday());
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_weekday_from_name() {
        assert_eq!(weekday_from_name("Monday"), Some(0));
        assert_eq!(weekday_from_name(" wed "), Some(2));
        assert_eq!(weekday_from_name("6"), Some(6));
        assert_eq!(weekday_from_name("7"), None);
        assert_eq!(weekday_from_name("funday"), None);
        assert_eq!(weekday_from_name(""), None);
    }

    #[test]
    fn test_parse_wall_clock_formats() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(parse_wall_clock("09:00"), Some(nine));
        assert_eq!(parse_wall_clock("09:00:00"), Some(nine));
        assert_eq!(parse_wall_clock("9"), Some(nine));
        assert_eq!(parse_wall_clock("25:00"), None);
        assert_eq!(parse_wall_clock("nine"), None);
        assert_eq!(parse_wall_clock(""), None);
    }

    #[test]
    fn test_weekly_rule_serializes_hhmm() {
        let rule = WeeklyRule::new(
            0,
            true,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        );
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["start_time"], "09:00");
        assert_eq!(value["end_time"], "14:00");

        let parsed: WeeklyRule = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn test_capacity_exhaustion() {
        let unlimited = CapacityLimit::default();
        assert!(!unlimited.is_exhausted(1_000));

        let limited = CapacityLimit { daily_patient_limit: Some(2), accepting_appointments: true };
        assert!(!limited.is_exhausted(1));
        assert!(limited.is_exhausted(2));
    }

    #[test]
    fn test_cancelled_appointment_occupies_nothing() {
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let mut appointment = Appointment::scheduled(
            Uuid::new_v4(),
            Uuid::new_v4(),
            date(2024, 1, 1),
            ten,
            date(2023, 12, 30).and_hms_opt(8, 0, 0).unwrap(),
        );
        assert!(appointment.occupies(ten));

        appointment.status = AppointmentStatus::Cancelled;
        assert!(!appointment.occupies(ten));
    }
}
