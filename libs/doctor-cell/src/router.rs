use std::sync::Arc;

use axum::{
    routing::{delete, get, put},
    Router,
};

use crate::handlers;
use crate::state::SchedulingState;

pub fn doctor_routes(state: Arc<SchedulingState>) -> Router {
    let availability_routes = Router::new()
        .route("/{doctor_id}/available-slots", get(handlers::get_available_slots))
        .route("/{doctor_id}/availability", get(handlers::get_availability_range))
        .route("/{doctor_id}/next-available", get(handlers::get_next_available));

    let schedule_routes = Router::new()
        .route("/{doctor_id}/weekly-rules", get(handlers::get_weekly_rules))
        .route("/{doctor_id}/weekly-rules/{weekday}", put(handlers::set_weekday))
        .route(
            "/{doctor_id}/exceptions",
            get(handlers::get_exceptions).post(handlers::create_exception),
        )
        .route("/{doctor_id}/exceptions/{exception_id}", delete(handlers::delete_exception));

    Router::new()
        .merge(availability_routes)
        .merge(schedule_routes)
        .with_state(state)
}
