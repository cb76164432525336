use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::{BookingLedger, CapacitySource, ScheduleStore, StorageError};
use shared_models::scheduling::{system_weekday, AppointmentStatus};
use shared_utils::Clock;

use crate::models::{DayAvailability, NextAvailableSlot, NoAvailability, Slot};
use crate::services::slots::SlotGenerator;

pub const DEFAULT_RANGE_DAYS: u32 = 7;
pub const MAX_RANGE_DAYS: u32 = 31;
pub const DEFAULT_SEARCH_DAYS: u32 = 30;
pub const MAX_SEARCH_DAYS: u32 = 90;

/// Computes the bookable slots of a practitioner for a date.
///
/// Every call reads the stores afresh; nothing is cached between calls.
pub struct AvailabilityResolver {
    schedule: Arc<dyn ScheduleStore>,
    capacity: Arc<dyn CapacitySource>,
    ledger: Arc<dyn BookingLedger>,
    clock: Arc<dyn Clock>,
    generator: SlotGenerator,
}

impl AvailabilityResolver {
    pub fn new(
        schedule: Arc<dyn ScheduleStore>,
        capacity: Arc<dyn CapacitySource>,
        ledger: Arc<dyn BookingLedger>,
        clock: Arc<dyn Clock>,
        config: &SchedulingConfig,
    ) -> Self {
        Self {
            schedule,
            capacity,
            ledger,
            clock,
            generator: SlotGenerator::new(config),
        }
    }

    pub async fn resolve(&self, practitioner_id: Uuid, date: NaiveDate) -> Result<DayAvailability, StorageError> {
        let now = self.clock.now();
        self.resolve_at(practitioner_id, date, now).await
    }

    /// Resolves `days` consecutive dates starting at `start`.
    pub async fn resolve_range(
        &self,
        practitioner_id: Uuid,
        start: NaiveDate,
        days: u32,
    ) -> Result<Vec<DayAvailability>, StorageError> {
        let days = days.clamp(1, MAX_RANGE_DAYS);
        let now = self.clock.now();
        debug!("Resolving {} days from {} for practitioner {}", days, start, practitioner_id);

        let mut results = Vec::with_capacity(days as usize);
        for offset in 0..days {
            let date = start + Duration::days(offset as i64);
            results.push(self.resolve_at(practitioner_id, date, now).await?);
        }
        Ok(results)
    }

    /// First bookable (date, time) on or after `from`, looking at most `max_days` ahead.
    pub async fn next_available(
        &self,
        practitioner_id: Uuid,
        from: NaiveDate,
        max_days: u32,
    ) -> Result<Option<NextAvailableSlot>, StorageError> {
        let max_days = max_days.clamp(1, MAX_SEARCH_DAYS);
        let now = self.clock.now();
        let start = from.max(now.date());

        for offset in 0..max_days {
            let date = start + Duration::days(offset as i64);
            let day = self.resolve_at(practitioner_id, date, now).await?;
            let first = day.bookable_times().next();
            if let Some(time) = first {
                debug!("Next available slot for {}: {} {}", practitioner_id, date, time);
                return Ok(Some(NextAvailableSlot { date, time }));
            }
        }

        debug!("No available slot for {} within {} days of {}", practitioner_id, max_days, start);
        Ok(None)
    }

    async fn resolve_at(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<DayAvailability, StorageError> {
        if date < now.date() {
            return Ok(DayAvailability::blocked(practitioner_id, date, NoAvailability::DateInPast));
        }

        let (rules, exceptions) = tokio::try_join!(
            self.schedule.get_weekly_rules(practitioner_id),
            self.schedule.get_exceptions(practitioner_id),
        )?;

        // Storage may hold several exceptions for one date; the latest one wins.
        // Only closing exceptions act here: an open one never adds hours to a closed weekday.
        let exception = exceptions.into_iter().filter(|e| e.date == date).last();
        if let Some(exception) = exception.filter(|e| !e.is_available) {
            debug!("Date {} excepted for {}: {}", date, practitioner_id, exception.reason);
            return Ok(DayAvailability::blocked(
                practitioner_id,
                date,
                NoAvailability::Exception { reason: exception.reason },
            ));
        }

        let weekday = system_weekday(date);
        let Some(rule) = rules.into_iter().find(|r| r.weekday == weekday && r.is_available) else {
            return Ok(DayAvailability::blocked(practitioner_id, date, NoAvailability::NoRegularHours));
        };

        let capacity = self.capacity.get_capacity(practitioner_id).await?;
        if !capacity.accepting_appointments {
            return Ok(DayAvailability::blocked(practitioner_id, date, NoAvailability::NotAccepting));
        }

        let scheduled = self
            .ledger
            .list_appointments(practitioner_id, date, AppointmentStatus::Scheduled)
            .await?;
        if capacity.is_exhausted(scheduled.len()) {
            debug!(
                "Daily limit reached for {} on {} ({} scheduled)",
                practitioner_id,
                date,
                scheduled.len()
            );
            return Ok(DayAvailability::blocked(practitioner_id, date, NoAvailability::DailyLimitReached));
        }

        let generated = self.generator.generate(rule.start_time, rule.end_time, date, now);
        if generated.used_default_window {
            warn!(
                "Practitioner {} has a malformed {} rule; offering default hours on {}",
                practitioner_id,
                rule.day_name(),
                date
            );
        }

        let slots: Vec<Slot> = generated
            .times
            .into_iter()
            .map(|time| {
                if scheduled.iter().any(|a| a.occupies(time)) {
                    Slot::booked(time)
                } else {
                    Slot::open(time)
                }
            })
            .collect();

        debug!(
            "Resolved {} slots for {} on {} (weekday {})",
            slots.len(),
            practitioner_id,
            date,
            weekday
        );

        Ok(DayAvailability {
            practitioner_id,
            date,
            slots,
            blocking_reason: None,
            daily_limit: capacity.daily_patient_limit,
        })
    }
}
