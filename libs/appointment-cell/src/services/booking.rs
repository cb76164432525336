use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::{AvailabilityResolver, NoAvailability, SchedulingState};
use shared_database::{BookingLedger, StorageError};
use shared_models::scheduling::{truncate_to_minute, Appointment};
use shared_utils::Clock;

use crate::models::{BookingError, ConflictError};

type DayKey = (Uuid, NaiveDate);

/// Books appointments so that no two scheduled appointments share a
/// (practitioner, date, time) and the daily limit holds.
///
/// Bookings for the same practitioner and date run one at a time in this
/// process. The ledger's atomic compare-and-insert covers writers in other
/// processes, for both slot uniqueness and the daily limit.
pub struct BookingValidator {
    resolver: AvailabilityResolver,
    ledger: Arc<dyn BookingLedger>,
    clock: Arc<dyn Clock>,
    day_locks: DashMap<DayKey, Arc<Mutex<()>>>,
}

impl BookingValidator {
    pub fn new(scheduling: &SchedulingState) -> Self {
        Self {
            resolver: scheduling.resolver(),
            ledger: scheduling.ledger.clone(),
            clock: scheduling.clock.clone(),
            day_locks: DashMap::new(),
        }
    }

    pub async fn try_book(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        patient_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        let key = (practitioner_id, date);
        let lock = self.day_lock(key);

        let result = {
            let _guard = lock.lock().await;
            self.book_locked(practitioner_id, date, truncate_to_minute(time), patient_id)
                .await
        };

        drop(lock);
        self.release_day_lock(key);
        result
    }

    async fn book_locked(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        patient_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        debug!("Booking {} {} for practitioner {}", date, time, practitioner_id);

        let day = self.resolver.resolve(practitioner_id, date).await?;
        if day.is_blocked() {
            debug!(
                "Booking rejected, {} unavailable for {}: {:?}",
                date, practitioner_id, day.blocking_reason
            );
            return Err(ConflictError::date_unavailable(day.blocking_reason).into());
        }

        if !day.is_bookable(time) {
            debug!("Booking rejected, {} {} not offered for {}", date, time, practitioner_id);
            return Err(ConflictError::slot_not_offered().into());
        }

        let appointment = Appointment::scheduled(practitioner_id, patient_id, date, time, self.clock.now());
        match self.ledger.insert_within_limit(appointment, day.daily_limit).await {
            Ok(saved) => {
                info!(
                    "Appointment {} booked with practitioner {} on {} at {}",
                    saved.id,
                    practitioner_id,
                    date,
                    time.format("%H:%M")
                );
                Ok(saved)
            }
            Err(StorageError::Duplicate { .. }) => {
                warn!(
                    "Lost booking race for practitioner {} on {} at {}",
                    practitioner_id,
                    date,
                    time.format("%H:%M")
                );
                Err(ConflictError::slot_not_offered().into())
            }
            Err(StorageError::CapacityExceeded { limit, .. }) => {
                warn!(
                    "Daily limit {} filled for practitioner {} on {} before insert",
                    limit, practitioner_id, date
                );
                Err(ConflictError::date_unavailable(Some(NoAvailability::DailyLimitReached)).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn day_lock(&self, key: DayKey) -> Arc<Mutex<()>> {
        self.day_locks.entry(key).or_default().clone()
    }

    fn release_day_lock(&self, key: DayKey) {
        // Only the map holds it: nobody else is waiting on this day.
        self.day_locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    fn held_day_locks(&self) -> usize {
        self.day_locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_database::{InMemoryStore, ScheduleStore};
    use shared_utils::test_utils::{date, open_rule, time, wall_clock, TestConfig};
    use shared_utils::FixedClock;

    #[tokio::test]
    async fn test_day_locks_are_pruned_after_booking() {
        let config = TestConfig::default().to_arc();
        let store = Arc::new(InMemoryStore::new(config.scheduling.clone()));
        let clock = Arc::new(FixedClock::new(wall_clock(date(2023, 12, 31), 12, 0)));
        let state = SchedulingState::in_memory(config, store, clock);
        let practitioner = Uuid::new_v4();
        state
            .schedule
            .upsert_weekly_rule(practitioner, open_rule(0, (9, 0), (12, 0)))
            .await
            .unwrap();

        let validator = BookingValidator::new(&state);
        validator
            .try_book(practitioner, date(2024, 1, 1), time(9, 0), Uuid::new_v4())
            .await
            .unwrap();
        let _ = validator
            .try_book(practitioner, date(2024, 1, 2), time(9, 0), Uuid::new_v4())
            .await;

        assert_eq!(validator.held_day_locks(), 0);
    }
}
