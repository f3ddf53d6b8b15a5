// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{
    AppointmentDraft, AppointmentError, AppointmentStatus, CalendarPeriod, CalendarViewState,
    SeriesConflictPolicy, StatusAction, StatusTransition,
};
use crate::router::AppointmentState;
use crate::services::calendar::workload_by_service;

// ==============================================================================
// REQUEST BODIES AND QUERY PARAMETERS
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAppointmentRequest {
    pub draft: AppointmentDraft,
    #[serde(default)]
    pub policy: SeriesConflictPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub period: Option<CalendarPeriod>,
    pub date: NaiveDate,
    pub timezone: Option<Tz>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub current_status: AppointmentStatus,
    pub action: StatusAction,
}

#[derive(Debug, Deserialize)]
pub struct ActionsQuery {
    pub status: AppointmentStatus,
}

pub fn map_appointment_error(error: AppointmentError) -> AppError {
    match error {
        AppointmentError::Validation(msg) | AppointmentError::InvalidTime(msg) => AppError::ValidationError(msg),
        AppointmentError::ServiceUnavailable
        | AppointmentError::DoubleBooked
        | AppointmentError::SeriesRejected { .. } => AppError::Conflict(error.to_string()),
        AppointmentError::ActionDisabled { .. } | AppointmentError::NothingToUndo(_) => {
            AppError::Conflict(error.to_string())
        }
        AppointmentError::Transport(msg) => AppError::ExternalService(msg),
        // Already saved appointments are named in the message so the caller can reconcile.
        AppointmentError::PartialSubmission { .. } => AppError::ExternalService(error.to_string()),
        AppointmentError::NoContent => AppError::NoContent("EMR returned an empty response".to_string()),
        AppointmentError::Aborted => AppError::Internal(error.to_string()),
    }
}

// ==============================================================================
// SCHEDULING HANDLERS
// ==============================================================================

/// Expand a draft into its concrete occurrences.
#[axum::debug_handler]
pub async fn expand_occurrences(
    State(state): State<Arc<AppointmentState>>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<Json<Value>, AppError> {
    let occurrences = state.scheduling.occurrences(&draft).map_err(map_appointment_error)?;

    Ok(Json(json!({
        "count": occurrences.len(),
        "occurrences": occurrences,
    })))
}

/// Expand and screen a draft against the current appointments.
#[axum::debug_handler]
pub async fn preview_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<Json<Value>, AppError> {
    let screened = state.scheduling.preview(&draft, None).await.map_err(map_appointment_error)?;
    let rejected = screened.iter().filter(|entry| !entry.outcome.is_accepted()).count();

    Ok(Json(json!({
        "occurrences": screened,
        "rejected": rejected,
    })))
}

/// The payload that would be submitted for a draft.
#[axum::debug_handler]
pub async fn build_appointment_payload(
    State(state): State<Arc<AppointmentState>>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<Json<Value>, AppError> {
    let payload = state.scheduling.build_payload(&draft).map_err(map_appointment_error)?;
    Ok(Json(json!(payload)))
}

#[axum::debug_handler]
pub async fn submit_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<SubmitAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.scheduling
        .submit(&request.draft, request.policy, None)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "submission": outcome,
        "message": "Appointment saved successfully"
    })))
}

// ==============================================================================
// CALENDAR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_calendar(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let view = CalendarViewState {
        period: query.period.unwrap_or_default(),
        reference_date: query.date,
        timezone: query.timezone.unwrap_or(state.config.scheduling_timezone),
    };

    let buckets = state.scheduling.calendar(&view, None).await.map_err(map_appointment_error)?;
    let workload = workload_by_service(&buckets);

    Ok(Json(json!({
        "view": view,
        "buckets": buckets,
        "workload": workload,
    })))
}

// ==============================================================================
// STATUS HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_actions(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_uuid): Path<String>,
    Query(query): Query<ActionsQuery>,
) -> Result<Json<Value>, AppError> {
    let actions = state.scheduling.lifecycle().available_actions(query.status);

    Ok(Json(json!({
        "appointmentUuid": appointment_uuid,
        "status": query.status,
        "actions": actions,
    })))
}

#[axum::debug_handler]
pub async fn change_appointment_status(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_uuid): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<Value>, AppError> {
    let transition = state.scheduling
        .change_status(&appointment_uuid, request.current_status, request.action, None)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "transition": transition,
    })))
}

#[axum::debug_handler]
pub async fn undo_appointment_status(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_uuid): Path<String>,
    Json(transition): Json<StatusTransition>,
) -> Result<Json<Value>, AppError> {
    if transition.appointment_uuid != appointment_uuid {
        return Err(AppError::BadRequest("Transition belongs to a different appointment".to_string()));
    }

    let reverted = state.scheduling
        .undo_status(&transition, None)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "transition": reverted,
    })))
}
