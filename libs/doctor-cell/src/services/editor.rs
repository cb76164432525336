use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_database::ScheduleStore;
use shared_models::scheduling::{parse_wall_clock, ScheduleException, WeeklyRule, DAYS_PER_WEEK};

use crate::models::ScheduleEditError;

/// The only writer of weekly rules and exceptions.
pub struct ScheduleEditor {
    store: Arc<dyn ScheduleStore>,
    defaults: SchedulingConfig,
}

impl ScheduleEditor {
    pub fn new(store: Arc<dyn ScheduleStore>, defaults: SchedulingConfig) -> Self {
        Self { store, defaults }
    }

    pub async fn weekly_rules(&self, practitioner_id: Uuid) -> Result<Vec<WeeklyRule>, ScheduleEditError> {
        Ok(self.store.get_weekly_rules(practitioner_id).await?)
    }

    /// Upserts the rule for one weekday.
    ///
    /// Times left out keep their previously stored values, so toggling a day
    /// off and on again restores its hours.
    pub async fn set_weekday(
        &self,
        practitioner_id: Uuid,
        weekday: u8,
        is_available: bool,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> Result<WeeklyRule, ScheduleEditError> {
        if weekday >= DAYS_PER_WEEK {
            return Err(ScheduleEditError::Validation(format!(
                "weekday must be between 0 (Monday) and 6 (Sunday), got {}",
                weekday
            )));
        }

        let start = start_time.map(|raw| parse_time("start_time", raw)).transpose()?;
        let end = end_time.map(|raw| parse_time("end_time", raw)).transpose()?;

        let existing = self
            .store
            .get_weekly_rules(practitioner_id)
            .await?
            .into_iter()
            .find(|r| r.weekday == weekday);

        let (prior_start, prior_end) = existing
            .map(|r| (r.start_time, r.end_time))
            .unwrap_or((self.defaults.default_day_start, self.defaults.default_day_end));

        let rule = WeeklyRule::new(
            weekday,
            is_available,
            start.unwrap_or(prior_start),
            end.unwrap_or(prior_end),
        );

        if rule.is_available && !rule.has_valid_window() {
            return Err(ScheduleEditError::Validation(
                "start_time must be before end_time".to_string(),
            ));
        }

        let saved = self.store.upsert_weekly_rule(practitioner_id, rule).await?;
        info!(
            "Set {} for practitioner {}: available={} {}-{}",
            saved.day_name(),
            practitioner_id,
            saved.is_available,
            saved.start_time.format("%H:%M"),
            saved.end_time.format("%H:%M")
        );
        Ok(saved)
    }

    pub async fn exceptions(&self, practitioner_id: Uuid) -> Result<Vec<ScheduleException>, ScheduleEditError> {
        let mut exceptions = self.store.get_exceptions(practitioner_id).await?;
        exceptions.sort_by_key(|e| e.date);
        Ok(exceptions)
    }

    /// Adds an exception, replacing any existing one for the same date.
    pub async fn add_exception(
        &self,
        practitioner_id: Uuid,
        date: NaiveDate,
        is_available: bool,
        reason: &str,
    ) -> Result<ScheduleException, ScheduleEditError> {
        let exception = ScheduleException {
            id: Uuid::new_v4(),
            practitioner_id,
            date,
            is_available,
            reason: reason.trim().to_string(),
        };

        let saved = self.store.create_exception(exception).await?;
        info!(
            "Added exception {} for practitioner {} on {} (available={})",
            saved.id, practitioner_id, saved.date, saved.is_available
        );
        Ok(saved)
    }

    pub async fn remove_exception(&self, practitioner_id: Uuid, exception_id: Uuid) -> Result<(), ScheduleEditError> {
        debug!("Removing exception {} for practitioner {}", exception_id, practitioner_id);
        self.store.delete_exception(practitioner_id, exception_id).await?;
        info!("Removed exception {} for practitioner {}", exception_id, practitioner_id);
        Ok(())
    }
}

fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, ScheduleEditError> {
    parse_wall_clock(raw)
        .ok_or_else(|| ScheduleEditError::Validation(format!("{} '{}' is not a valid HH:MM time", field, raw)))
}
