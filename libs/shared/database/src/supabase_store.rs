use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig};
use shared_models::scheduling::{
    format_wall_clock, parse_wall_clock, Appointment, AppointmentStatus, CapacityLimit, ScheduleException,
    WeeklyRule,
};

use crate::normalize::{normalize_exceptions, normalize_weekly_rules};
use crate::store::{BookingLedger, CapacitySource, ScheduleStore, StorageError};
use crate::supabase::{merge_duplicates, return_representation, SupabaseClient};

/// Message raised by the `book_appointment` function when the day is full.
const DAILY_LIMIT_REACHED: &str = "daily_limit_reached";

/// PostgREST-backed store. Scheduled-slot uniqueness is enforced by the
/// `appointments_one_scheduled_per_slot` partial unique index, the daily limit
/// by the `book_appointment` function (see migrations).
pub struct SupabaseStore {
    supabase: SupabaseClient,
    defaults: SchedulingConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct AppointmentRow {
    id: Uuid,
    doctor_id: Uuid,
    patient_id: Uuid,
    appointment_date: NaiveDate,
    appointment_time: String,
    status: AppointmentStatus,
    created_at: NaiveDateTime,
}

impl AppointmentRow {
    fn from_appointment(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            doctor_id: appointment.practitioner_id,
            patient_id: appointment.patient_id,
            appointment_date: appointment.date,
            appointment_time: format_wall_clock(appointment.time),
            status: appointment.status,
            created_at: appointment.created_at,
        }
    }

    fn into_appointment(self) -> Result<Appointment, StorageError> {
        let time = parse_wall_clock(&self.appointment_time).ok_or_else(|| {
            StorageError::Decode(format!("appointment {} has invalid time '{}'", self.id, self.appointment_time))
        })?;
        Ok(Appointment {
            id: self.id,
            practitioner_id: self.doctor_id,
            patient_id: self.patient_id,
            date: self.appointment_date,
            time,
            status: self.status,
            created_at: self.created_at,
        })
    }
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            defaults: config.scheduling.clone(),
        }
    }

    // Profiles created before per-day rows existed keep their hours on the doctors row.
    async fn get_legacy_profile_schedule(&self, practitioner_id: Uuid) -> Result<Value, StorageError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=available_days,day_specific_data",
            practitioner_id
        );
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(result.into_iter().next().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ScheduleStore for SupabaseStore {
    async fn get_weekly_rules(&self, practitioner_id: Uuid) -> Result<Vec<WeeklyRule>, StorageError> {
        debug!("Fetching weekly rules for doctor {}", practitioner_id);

        let path = format!(
            "/rest/v1/doctor_weekly_rules?doctor_id=eq.{}&order=weekday.asc",
            practitioner_id
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        let raw = if rows.is_empty() {
            self.get_legacy_profile_schedule(practitioner_id).await?
        } else {
            Value::Array(rows)
        };

        let normalized = normalize_weekly_rules(&raw, &self.defaults);
        if !normalized.fallback_weekdays.is_empty() {
            warn!(
                "Doctor {} has malformed hours on weekdays {:?}, default window applied",
                practitioner_id, normalized.fallback_weekdays
            );
        }
        Ok(normalized.rules)
    }

    async fn upsert_weekly_rule(&self, practitioner_id: Uuid, rule: WeeklyRule) -> Result<WeeklyRule, StorageError> {
        let body = json!({
            "doctor_id": practitioner_id,
            "weekday": rule.weekday,
            "is_available": rule.is_available,
            "start_time": format_wall_clock(rule.start_time),
            "end_time": format_wall_clock(rule.end_time),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_weekly_rules?on_conflict=doctor_id,weekday",
                Some(body),
                Some(merge_duplicates()),
            )
            .await?;

        if result.is_empty() {
            return Err(StorageError::Request("weekly rule upsert returned no rows".to_string()));
        }

        Ok(rule)
    }

    async fn get_exceptions(&self, practitioner_id: Uuid) -> Result<Vec<ScheduleException>, StorageError> {
        let path = format!(
            "/rest/v1/doctor_exceptions?doctor_id=eq.{}&order=exception_date.asc",
            practitioner_id
        );
        let rows: Value = self.supabase.request(Method::GET, &path, None).await?;
        Ok(normalize_exceptions(&rows, practitioner_id))
    }

    async fn create_exception(&self, exception: ScheduleException) -> Result<ScheduleException, StorageError> {
        let body = json!({
            "id": exception.id,
            "doctor_id": exception.practitioner_id,
            "exception_date": exception.date,
            "is_available": exception.is_available,
            "reason": exception.reason,
        });

        let rows: Value = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_exceptions?on_conflict=doctor_id,exception_date",
                Some(body),
                Some(merge_duplicates()),
            )
            .await?;

        normalize_exceptions(&rows, exception.practitioner_id)
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::Decode("exception insert returned no usable row".to_string()))
    }

    async fn delete_exception(&self, practitioner_id: Uuid, exception_id: Uuid) -> Result<(), StorageError> {
        let path = format!(
            "/rest/v1/doctor_exceptions?id=eq.{}&doctor_id=eq.{}",
            exception_id, practitioner_id
        );
        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(return_representation()))
            .await?;

        if deleted.is_empty() {
            return Err(StorageError::NotFound(format!("exception {}", exception_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl CapacitySource for SupabaseStore {
    async fn get_capacity(&self, practitioner_id: Uuid) -> Result<CapacityLimit, StorageError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=daily_patient_limit,is_available",
            practitioner_id
        );
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        let doctor = result
            .first()
            .ok_or_else(|| StorageError::NotFound(format!("doctor {}", practitioner_id)))?;

        let daily_patient_limit = match doctor.get("daily_patient_limit").and_then(Value::as_i64) {
            Some(limit) if limit >= 1 => Some(limit as u32),
            Some(limit) => {
                warn!("Doctor {} has invalid daily_patient_limit {}, treating as unlimited", practitioner_id, limit);
                None
            }
            None => None,
        };

        Ok(CapacityLimit {
            daily_patient_limit,
            accepting_appointments: doctor.get("is_available").and_then(Value::as_bool).unwrap_or(true),
        })
    }
}

#[async_trait]
impl BookingLedger for SupabaseStore {
    async fn list_appointments(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StorageError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=eq.{}&order=appointment_time.asc",
            practitioner_id, date, status
        );
        let rows: Vec<AppointmentRow> = self.supabase.request(Method::GET, &path, None).await?;
        rows.into_iter().map(AppointmentRow::into_appointment).collect()
    }

    async fn insert_within_limit(
        &self,
        appointment: Appointment,
        daily_limit: Option<u32>,
    ) -> Result<Appointment, StorageError> {
        // book_appointment counts and inserts in one transaction (see migrations).
        let body = json!({
            "p_id": appointment.id,
            "p_doctor_id": appointment.practitioner_id,
            "p_patient_id": appointment.patient_id,
            "p_date": appointment.date,
            "p_time": format_wall_clock(appointment.time),
            "p_status": appointment.status,
            "p_created_at": appointment.created_at,
            "p_daily_limit": daily_limit,
        });

        let result: Result<Vec<AppointmentRow>, _> = self
            .supabase
            .request(Method::POST, "/rest/v1/rpc/book_appointment", Some(body))
            .await;

        match result {
            Ok(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| StorageError::Request("appointment insert returned no rows".to_string()))?
                .into_appointment(),
            Err(e) if e.is_conflict() && e.message().as_deref() == Some(DAILY_LIMIT_REACHED) => {
                Err(StorageError::CapacityExceeded {
                    practitioner_id: appointment.practitioner_id,
                    date: appointment.date,
                    limit: daily_limit.unwrap_or_default(),
                })
            }
            Err(e) if e.is_conflict() => Err(StorageError::Duplicate {
                practitioner_id: appointment.practitioner_id,
                date: appointment.date,
                time: appointment.time,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
