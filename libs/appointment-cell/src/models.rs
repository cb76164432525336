use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::NoAvailability;
use shared_database::StorageError;
use shared_models::error::AppError;
use shared_models::scheduling::{hhmm, AppointmentStatus};

/// Shown to patients whenever a booking loses.
pub const SLOT_TAKEN_MESSAGE: &str = "this slot was just taken, please pick another.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub practitioner_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentListQuery {
    pub date: NaiveDate,
    pub status: Option<AppointmentStatus>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The whole date offers nothing; carries the resolver's reason when there was one.
    #[error("date unavailable")]
    DateUnavailable(Option<NoAvailability>),

    /// The time is not offered, or is offered but already booked.
    #[error("slot not in result set")]
    SlotNotOffered,
}

/// Booking-time failure. Retryable by re-resolving and picking another slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ConflictError {
    pub reason: ConflictReason,
}

impl ConflictError {
    pub fn date_unavailable(cause: Option<NoAvailability>) -> Self {
        Self { reason: ConflictReason::DateUnavailable(cause) }
    }

    pub fn slot_not_offered() -> Self {
        Self { reason: ConflictReason::SlotNotOffered }
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Booking conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Conflict(_) => AppError::Conflict(SLOT_TAKEN_MESSAGE.to_string()),
            BookingError::Storage(storage) => storage.into(),
        }
    }
}
