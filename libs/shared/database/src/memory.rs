use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_models::scheduling::{
    Appointment, AppointmentStatus, CapacityLimit, ScheduleException, WeeklyRule, DAYS_PER_WEEK,
};

use crate::store::{BookingLedger, CapacitySource, ScheduleStore, StorageError};

/// Process-local store backing all three collaborator seams.
///
/// Appointments are sharded by (practitioner, date); the uniqueness check and
/// the push happen under that shard's write guard.
pub struct InMemoryStore {
    defaults: SchedulingConfig,
    weekly_rules: DashMap<Uuid, Vec<WeeklyRule>>,
    exceptions: DashMap<Uuid, Vec<ScheduleException>>,
    capacity: DashMap<Uuid, CapacityLimit>,
    appointments: DashMap<(Uuid, NaiveDate), Vec<Appointment>>,
}

impl InMemoryStore {
    pub fn new(defaults: SchedulingConfig) -> Self {
        Self {
            defaults,
            weekly_rules: DashMap::new(),
            exceptions: DashMap::new(),
            capacity: DashMap::new(),
            appointments: DashMap::new(),
        }
    }

    /// Profile management owns capacity; this is its write path for the in-memory backend.
    pub fn set_capacity(&self, practitioner_id: Uuid, capacity: CapacityLimit) {
        self.capacity.insert(practitioner_id, capacity);
    }

    /// Status transitions happen outside the engine; this mirrors them for the in-memory backend.
    pub fn set_appointment_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> bool {
        for mut day in self.appointments.iter_mut() {
            if let Some(appointment) = day.value_mut().iter_mut().find(|a| a.id == appointment_id) {
                appointment.status = status;
                return true;
            }
        }
        false
    }

    fn default_rules(&self) -> Vec<WeeklyRule> {
        (0..DAYS_PER_WEEK)
            .map(|weekday| {
                WeeklyRule::closed(weekday, self.defaults.default_day_start, self.defaults.default_day_end)
            })
            .collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(SchedulingConfig::default())
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn get_weekly_rules(&self, practitioner_id: Uuid) -> Result<Vec<WeeklyRule>, StorageError> {
        Ok(self
            .weekly_rules
            .get(&practitioner_id)
            .map(|rules| rules.clone())
            .unwrap_or_else(|| self.default_rules()))
    }

    async fn upsert_weekly_rule(&self, practitioner_id: Uuid, rule: WeeklyRule) -> Result<WeeklyRule, StorageError> {
        if rule.weekday >= DAYS_PER_WEEK {
            return Err(StorageError::Request(format!("weekday {} out of range", rule.weekday)));
        }
        let mut rules = self
            .weekly_rules
            .entry(practitioner_id)
            .or_insert_with(|| self.default_rules());
        rules[rule.weekday as usize] = rule.clone();
        Ok(rule)
    }

    async fn get_exceptions(&self, practitioner_id: Uuid) -> Result<Vec<ScheduleException>, StorageError> {
        Ok(self
            .exceptions
            .get(&practitioner_id)
            .map(|list| list.clone())
            .unwrap_or_default())
    }

    async fn create_exception(&self, exception: ScheduleException) -> Result<ScheduleException, StorageError> {
        let mut list = self.exceptions.entry(exception.practitioner_id).or_default();
        if let Some(existing) = list.iter_mut().find(|e| e.date == exception.date) {
            debug!("Replacing exception {} for {}", existing.id, exception.date);
            *existing = exception.clone();
        } else {
            list.push(exception.clone());
        }
        Ok(exception)
    }

    async fn delete_exception(&self, practitioner_id: Uuid, exception_id: Uuid) -> Result<(), StorageError> {
        let mut list = self
            .exceptions
            .get_mut(&practitioner_id)
            .ok_or_else(|| StorageError::NotFound(format!("exception {}", exception_id)))?;
        let before = list.len();
        list.retain(|e| e.id != exception_id);
        if list.len() == before {
            return Err(StorageError::NotFound(format!("exception {}", exception_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl CapacitySource for InMemoryStore {
    async fn get_capacity(&self, practitioner_id: Uuid) -> Result<CapacityLimit, StorageError> {
        Ok(self
            .capacity
            .get(&practitioner_id)
            .map(|c| c.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl BookingLedger for InMemoryStore {
    async fn list_appointments(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
        status: AppointmentStatus,
    ) -> Result<Vec<Appointment>, StorageError> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .get(&(practitioner_id, date))
            .map(|day| day.iter().filter(|a| a.status == status).cloned().collect())
            .unwrap_or_default();
        appointments.sort_by_key(|a| a.time);
        Ok(appointments)
    }

    async fn insert_within_limit(
        &self,
        appointment: Appointment,
        daily_limit: Option<u32>,
    ) -> Result<Appointment, StorageError> {
        let mut day = self
            .appointments
            .entry((appointment.practitioner_id, appointment.date))
            .or_default();

        if appointment.is_scheduled() {
            if day.iter().any(|existing| existing.occupies(appointment.time)) {
                return Err(StorageError::Duplicate {
                    practitioner_id: appointment.practitioner_id,
                    date: appointment.date,
                    time: appointment.time,
                });
            }

            let scheduled = day.iter().filter(|existing| existing.is_scheduled()).count();
            if let Some(limit) = daily_limit.filter(|limit| scheduled >= *limit as usize) {
                return Err(StorageError::CapacityExceeded {
                    practitioner_id: appointment.practitioner_id,
                    date: appointment.date,
                    limit,
                });
            }
        }

        day.push(appointment.clone());
        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveTime;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn appointment(practitioner: Uuid, time: NaiveTime) -> Appointment {
        Appointment::scheduled(practitioner, Uuid::new_v4(), monday(), time, monday().and_hms_opt(7, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_weekly_rules_default_filled() {
        let store = InMemoryStore::default();
        let rules = store.get_weekly_rules(Uuid::new_v4()).await.unwrap();
        assert_eq!(rules.len(), 7);
        assert!(rules.iter().all(|r| !r.is_available));
        assert_eq!(rules.iter().map(|r| r.weekday).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_scheduled_slot() {
        let store = InMemoryStore::default();
        let practitioner = Uuid::new_v4();

        store.insert_appointment(appointment(practitioner, at(10, 0))).await.unwrap();
        let second = store.insert_appointment(appointment(practitioner, at(10, 0))).await;

        assert_matches!(second, Err(StorageError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_insert_enforces_daily_limit() {
        let store = InMemoryStore::default();
        let practitioner = Uuid::new_v4();

        store.insert_within_limit(appointment(practitioner, at(9, 0)), Some(2)).await.unwrap();
        store.insert_within_limit(appointment(practitioner, at(9, 30)), Some(2)).await.unwrap();
        let third = store.insert_within_limit(appointment(practitioner, at(10, 0)), Some(2)).await;

        assert_matches!(third, Err(StorageError::CapacityExceeded { limit: 2, .. }));
        // No limit given: only slot uniqueness applies.
        store.insert_appointment(appointment(practitioner, at(10, 0))).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_slot_can_be_rebooked() {
        let store = InMemoryStore::default();
        let practitioner = Uuid::new_v4();

        let first = store.insert_appointment(appointment(practitioner, at(10, 0))).await.unwrap();
        assert!(store.set_appointment_status(first.id, AppointmentStatus::Cancelled));

        store.insert_appointment(appointment(practitioner, at(10, 0))).await.unwrap();
        let scheduled = store
            .list_appointments(practitioner, monday(), AppointmentStatus::Scheduled)
            .await
            .unwrap();
        assert_eq!(scheduled.len(), 1);
    }

    #[tokio::test]
    async fn test_exception_for_same_date_is_replaced() {
        let store = InMemoryStore::default();
        let practitioner = Uuid::new_v4();
        let make = |reason: &str| ScheduleException {
            id: Uuid::new_v4(),
            practitioner_id: practitioner,
            date: monday(),
            is_available: false,
            reason: reason.to_string(),
        };

        store.create_exception(make("Conference")).await.unwrap();
        store.create_exception(make("Sick leave")).await.unwrap();

        let exceptions = store.get_exceptions(practitioner).await.unwrap();
        assert_eq!(exceptions.len(), 1);
        assert_eq!(exceptions[0].reason, "Sick leave");
    }

    #[tokio::test]
    async fn test_delete_unknown_exception_is_not_found() {
        let store = InMemoryStore::default();
        let result = store.delete_exception(Uuid::new_v4(), Uuid::new_v4()).await;
        assert_matches!(result, Err(StorageError::NotFound(_)));
    }
}
