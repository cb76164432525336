use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StorageError;
use shared_models::scheduling::hhmm;

pub const ALREADY_BOOKED: &str = "already booked";

/// A candidate start time with its computed availability. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Slot {
    pub fn open(time: NaiveTime) -> Self {
        Self { time, is_available: true, reason: None }
    }

    pub fn booked(time: NaiveTime) -> Self {
        Self {
            time,
            is_available: false,
            reason: Some(ALREADY_BOOKED.to_string()),
        }
    }
}

/// Why a whole date offers nothing. Soft and expected: the caller picks another date.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoAvailability {
    #[error("date in the past")]
    DateInPast,

    #[error("{}", exception_reason(.reason))]
    Exception { reason: String },

    #[error("no regular hours this day")]
    NoRegularHours,

    #[error("not currently accepting appointments")]
    NotAccepting,

    #[error("daily limit reached")]
    DailyLimitReached,
}

fn exception_reason(reason: &str) -> &str {
    if reason.trim().is_empty() {
        "No reason provided"
    } else {
        reason
    }
}

/// Outcome of resolving one (practitioner, date).
#[derive(Debug, Clone, PartialEq)]
pub struct DayAvailability {
    pub practitioner_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
    pub blocking_reason: Option<NoAvailability>,
    /// Capacity in force when the slots were computed; bookings re-check it at insert.
    pub daily_limit: Option<u32>,
}

impl DayAvailability {
    pub fn blocked(practitioner_id: Uuid, date: NaiveDate, reason: NoAvailability) -> Self {
        Self {
            practitioner_id,
            date,
            slots: Vec::new(),
            blocking_reason: Some(reason),
            daily_limit: None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocking_reason.is_some() || self.slots.is_empty()
    }

    pub fn bookable_times(&self) -> impl Iterator<Item = NaiveTime> + '_ {
        self.slots.iter().filter(|s| s.is_available).map(|s| s.time)
    }

    pub fn is_bookable(&self, time: NaiveTime) -> bool {
        self.slots.iter().any(|s| s.time == time && s.is_available)
    }

    pub fn to_response(&self) -> DayAvailabilityResponse {
        DayAvailabilityResponse {
            doctor_id: self.practitioner_id,
            date: self.date,
            available_count: self.bookable_times().count(),
            slots: self.slots.clone(),
            blocking_reason: self.blocking_reason.as_ref().map(ToString::to_string),
            message: self
                .blocking_reason
                .as_ref()
                .map(|reason| format!("no slots for this date, reason: {}", reason)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailabilityResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
    pub available_count: usize,
    pub blocking_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAvailableSlot {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
}

// Request DTOs

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetWeekdayRequest {
    pub is_available: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExceptionRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextAvailableQuery {
    pub from: Option<NaiveDate>,
    pub max_days: Option<u32>,
}

#[derive(Error, Debug)]
pub enum ScheduleEditError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
