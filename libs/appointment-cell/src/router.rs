// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::BookingState;

pub fn appointment_routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))
        .with_state(state)
}
