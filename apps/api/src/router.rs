use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use appointment_cell::BookingState;
use doctor_cell::router::doctor_routes;
use doctor_cell::SchedulingState;

pub fn create_router(state: Arc<SchedulingState>) -> Router {
    let booking = Arc::new(BookingState::new(state.clone()));

    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/doctors", doctor_routes(state))
        .nest("/appointments", appointment_routes(booking))
}
