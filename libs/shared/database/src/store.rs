//! Collaborator seams consumed by the availability engine.
//!
//! Implementations must be externally synchronised: every call reads current
//! state, and nothing is cached between calls.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::scheduling::{
    Appointment, AppointmentStatus, CapacityLimit, ScheduleException, WeeklyRule,
};

use crate::supabase::SupabaseError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Storage returned malformed data: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The uniqueness constraint on scheduled (practitioner, date, time) rejected a write.
    #[error("A scheduled appointment already exists for {practitioner_id} on {date} at {time}")]
    Duplicate {
        practitioner_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    },

    /// The practitioner already has `limit` scheduled appointments on `date`.
    #[error("Daily limit of {limit} reached for {practitioner_id} on {date}")]
    CapacityExceeded {
        practitioner_id: Uuid,
        date: NaiveDate,
        limit: u32,
    },
}

impl From<SupabaseError> for StorageError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Decode(msg) => StorageError::Decode(msg),
            SupabaseError::Status { status, body } if status.as_u16() == 404 => StorageError::NotFound(body),
            other => StorageError::Request(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Decode(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::Duplicate { .. } | StorageError::CapacityExceeded { .. } => {
                AppError::Conflict(err.to_string())
            }
            other => AppError::Storage(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Always seven rules, Monday first; weekdays without a stored rule are default-filled as closed.
    async fn get_weekly_rules(&self, practitioner_id: Uuid) -> Result<Vec<WeeklyRule>, StorageError>;

    /// Inserts or replaces the rule for `rule.weekday`.
    async fn upsert_weekly_rule(&self, practitioner_id: Uuid, rule: WeeklyRule) -> Result<WeeklyRule, StorageError>;

    async fn get_exceptions(&self, practitioner_id: Uuid) -> Result<Vec<ScheduleException>, StorageError>;

    /// Stores the exception, replacing any existing one for the same practitioner and date.
    async fn create_exception(&self, exception: ScheduleException) -> Result<ScheduleException, StorageError>;

    async fn delete_exception(&self, practitioner_id: Uuid, exception_id: Uuid) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CapacitySource: Send + Sync {
    async fn get_capacity(&self, practitioner_id: Uuid) -> Result<CapacityLimit, StorageError>;
}

#[async_trait]
pub trait BookingLedger: Send + Sync {
    async fn list_appointments(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StorageError>;

    /// Compare-and-insert: fails with [`StorageError::Duplicate`] when a scheduled
    /// appointment already holds the same (practitioner, date, time), and with
    /// [`StorageError::CapacityExceeded`] when `daily_limit` scheduled appointments
    /// already exist for that date. The count and the insert are one atomic step.
    async fn insert_within_limit(
        &self,
        appointment: Appointment,
        daily_limit: Option<u32>,
    ) -> Result<Appointment, StorageError>;

    async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment, StorageError> {
        self.insert_within_limit(appointment, None).await
    }
}
