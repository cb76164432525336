use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::{BookingLedger, CapacitySource, InMemoryStore, ScheduleStore};
use shared_utils::Clock;

use crate::services::{AvailabilityResolver, ScheduleEditor};

/// Router state shared by the scheduling and booking routes.
#[derive(Clone)]
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub schedule: Arc<dyn ScheduleStore>,
    pub capacity: Arc<dyn CapacitySource>,
    pub ledger: Arc<dyn BookingLedger>,
    pub clock: Arc<dyn Clock>,
}

impl SchedulingState {
    pub fn new(
        config: Arc<AppConfig>,
        schedule: Arc<dyn ScheduleStore>,
        capacity: Arc<dyn CapacitySource>,
        ledger: Arc<dyn BookingLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { config, schedule, capacity, ledger, clock }
    }

    /// One store behind every seam.
    pub fn in_memory(config: Arc<AppConfig>, store: Arc<InMemoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(config, store.clone(), store.clone(), store, clock)
    }

    pub fn resolver(&self) -> AvailabilityResolver {
        AvailabilityResolver::new(
            self.schedule.clone(),
            self.capacity.clone(),
            self.ledger.clone(),
            self.clock.clone(),
            &self.config.scheduling,
        )
    }

    pub fn editor(&self) -> ScheduleEditor {
        ScheduleEditor::new(self.schedule.clone(), self.config.scheduling.clone())
    }
}
