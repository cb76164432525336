use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig, StoreBackend};
use shared_models::scheduling::{Appointment, CapacityLimit, WeeklyRule};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub scheduling: SchedulingConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            store_backend: StoreBackend::Memory,
            api_port: 0,
            scheduling: self.scheduling.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid test time")
}

pub fn wall_clock(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    day.and_time(time(hour, minute))
}

pub fn open_rule(weekday: u8, start: (u32, u32), end: (u32, u32)) -> WeeklyRule {
    WeeklyRule::new(weekday, true, time(start.0, start.1), time(end.0, end.1))
}

pub fn limited_capacity(limit: u32) -> CapacityLimit {
    CapacityLimit {
        daily_patient_limit: Some(limit),
        accepting_appointments: true,
    }
}

pub fn scheduled_appointment(practitioner_id: Uuid, day: NaiveDate, hour: u32, minute: u32) -> Appointment {
    Appointment::scheduled(
        practitioner_id,
        Uuid::new_v4(),
        day,
        time(hour, minute),
        wall_clock(day, 0, 0),
    )
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn weekly_rule_row(practitioner_id: Uuid, weekday: u8, available: bool, start: &str, end: &str) -> Value {
        json!({
            "doctor_id": practitioner_id,
            "weekday": weekday,
            "is_available": available,
            "start_time": start,
            "end_time": end
        })
    }

    pub fn legacy_profile_schedule(available_days: Value, day_specific_data: Value) -> Value {
        json!({
            "available_days": available_days,
            "day_specific_data": day_specific_data
        })
    }

    pub fn exception_row(practitioner_id: Uuid, exception_id: Uuid, day: NaiveDate, reason: &str) -> Value {
        json!({
            "id": exception_id,
            "doctor_id": practitioner_id,
            "exception_date": day.format("%Y-%m-%d").to_string(),
            "is_available": false,
            "reason": reason
        })
    }

    pub fn capacity_row(daily_patient_limit: Option<i64>, is_available: bool) -> Value {
        json!({
            "daily_patient_limit": daily_patient_limit,
            "is_available": is_available
        })
    }

    pub fn appointment_row(appointment: &Appointment) -> Value {
        json!({
            "id": appointment.id,
            "doctor_id": appointment.practitioner_id,
            "patient_id": appointment.patient_id,
            "appointment_date": appointment.date.format("%Y-%m-%d").to_string(),
            "appointment_time": appointment.time.format("%H:%M:%S").to_string(),
            "status": appointment.status.to_string(),
            "created_at": appointment.created_at.format("%Y-%m-%dT%H:%M:%S").to_string()
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
