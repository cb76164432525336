use std::sync::Arc;

use doctor_cell::SchedulingState;

use crate::services::booking::BookingValidator;

/// The validator is shared so every request goes through the same day locks.
#[derive(Clone)]
pub struct BookingState {
    pub scheduling: Arc<SchedulingState>,
    pub validator: Arc<BookingValidator>,
}

impl BookingState {
    pub fn new(scheduling: Arc<SchedulingState>) -> Self {
        let validator = Arc::new(BookingValidator::new(&scheduling));
        Self { scheduling, validator }
    }
}
