use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::BookingLedger;
use shared_models::error::AppError;
use shared_models::scheduling::AppointmentStatus;

use crate::models::{AppointmentListQuery, BookAppointmentRequest};
use crate::state::BookingState;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<BookingState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = state
        .validator
        .try_book(request.practitioner_id, request.date, request.time, request.patient_id)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<BookingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let status = query.status.unwrap_or(AppointmentStatus::Scheduled);
    let appointments = state
        .scheduling
        .ledger
        .list_appointments(doctor_id, query.date, status)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len()
    })))
}
