use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AvailabilityRangeQuery, AvailableSlotsQuery, CreateExceptionRequest, NextAvailableQuery,
    ScheduleEditError, SetWeekdayRequest,
};
use crate::services::resolver::{DEFAULT_RANGE_DAYS, DEFAULT_SEARCH_DAYS};
use crate::state::SchedulingState;

impl From<ScheduleEditError> for AppError {
    fn from(err: ScheduleEditError) -> Self {
        match err {
            ScheduleEditError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleEditError::Storage(storage) => storage.into(),
        }
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let day = state.resolver().resolve(doctor_id, query.date).await?;
    Ok(Json(json!(day.to_response())))
}

#[axum::debug_handler]
pub async fn get_availability_range(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailabilityRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let start = query.start_date.unwrap_or_else(|| state.clock.today());
    let days = query.days.unwrap_or(DEFAULT_RANGE_DAYS);

    let results = state.resolver().resolve_range(doctor_id, start, days).await?;
    let days: Vec<_> = results.iter().map(|day| day.to_response()).collect();
    let total_available: usize = days.iter().map(|d| d.available_count).sum();

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "start_date": start,
        "days": days,
        "total_available": total_available
    })))
}

#[axum::debug_handler]
pub async fn get_next_available(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<NextAvailableQuery>,
) -> Result<Json<Value>, AppError> {
    let from = query.from.unwrap_or_else(|| state.clock.today());
    let max_days = query.max_days.unwrap_or(DEFAULT_SEARCH_DAYS);

    match state.resolver().next_available(doctor_id, from, max_days).await? {
        Some(next) => Ok(Json(json!({
            "doctor_id": doctor_id,
            "next_available": next
        }))),
        None => Ok(Json(json!({
            "doctor_id": doctor_id,
            "next_available": null,
            "message": "no available slots in the searched period"
        }))),
    }
}

// ==============================================================================
// WEEKLY RULES
// ==============================================================================

#[axum::debug_handler]
pub async fn get_weekly_rules(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let rules = state.editor().weekly_rules(doctor_id).await?;
    Ok(Json(json!({
        "doctor_id": doctor_id,
        "weekly_rules": rules
    })))
}

#[axum::debug_handler]
pub async fn set_weekday(
    State(state): State<Arc<SchedulingState>>,
    Path((doctor_id, weekday)): Path<(Uuid, u8)>,
    Json(request): Json<SetWeekdayRequest>,
) -> Result<Json<Value>, AppError> {
    let rule = state
        .editor()
        .set_weekday(
            doctor_id,
            weekday,
            request.is_available,
            request.start_time.as_deref(),
            request.end_time.as_deref(),
        )
        .await?;
    Ok(Json(json!(rule)))
}

// ==============================================================================
// EXCEPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_exceptions(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let exceptions = state.editor().exceptions(doctor_id).await?;
    Ok(Json(json!({
        "doctor_id": doctor_id,
        "exceptions": exceptions,
        "total": exceptions.len()
    })))
}

#[axum::debug_handler]
pub async fn create_exception(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateExceptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let exception = state
        .editor()
        .add_exception(doctor_id, request.date, request.is_available, &request.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(json!(exception))))
}

#[axum::debug_handler]
pub async fn delete_exception(
    State(state): State<Arc<SchedulingState>>,
    Path((doctor_id, exception_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.editor().remove_exception(doctor_id, exception_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
