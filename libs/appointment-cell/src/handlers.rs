// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::{require_role, require_self_or_admin, user_uuid};

use crate::models::{
    Appointment, BookAppointmentRequest, CancelAppointmentRequest, CancelledBy, RejectAppointmentRequest,
};
use crate::services::booking::BookingLedger;

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<BookingLedger>,
}

/// Only the patient, the treating doctor, or an admin may see or cancel an appointment.
pub fn require_participant(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }
    let caller = user_uuid(user)?;
    if caller == appointment.patient_id || caller == appointment.doctor_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not a participant of this appointment".to_string()))
    }
}

// ==============================================================================
// SLOT & BOOKING HANDLERS
// ==============================================================================

pub async fn list_slots(
    State(state): State<Arc<AppointmentState>>,
    Extension(_user): Extension<User>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    let slots = state.ledger.list_slots(doctor_id, date).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": date,
        "slots": slots,
        "total": slots.len()
    })))
}

pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Patient, Role::Admin])?;
    require_self_or_admin(&user, request.patient_id)?;

    let appointment = state.ledger.book(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.ledger.get_appointment(appointment_id).await?;
    require_participant(&user, &appointment)?;

    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn get_valid_transitions(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.ledger.get_appointment(appointment_id).await?;
    require_participant(&user, &appointment)?;
    let next = state.ledger.valid_transitions(appointment_id).await?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "status": appointment.status,
        "valid_transitions": next
    })))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

pub async fn approve_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Admin])?;
    let appointment = state.ledger.get_appointment(appointment_id).await?;
    require_self_or_admin(&user, appointment.doctor_id)?;

    let approved = state.ledger.approve(appointment_id).await?;
    info!("Appointment {} approved by {}", appointment_id, user.id);

    Ok(Json(json!({
        "success": true,
        "appointment": approved
    })))
}

pub async fn reject_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RejectAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Admin])?;
    let appointment = state.ledger.get_appointment(appointment_id).await?;
    require_self_or_admin(&user, appointment.doctor_id)?;

    let rejected = state.ledger.reject(appointment_id, request.reason).await?;
    info!("Appointment {} rejected by {}", appointment_id, user.id);

    Ok(Json(json!({
        "success": true,
        "appointment": rejected
    })))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.ledger.get_appointment(appointment_id).await?;
    require_participant(&user, &appointment)?;

    let cancelled_by = CancelledBy::from(user.role());
    let cancelled = state
        .ledger
        .cancel(appointment_id, cancelled_by, Some(request.reason))
        .await?;
    info!("Appointment {} cancelled by {} ({})", appointment_id, user.id, cancelled_by);

    Ok(Json(json!({
        "success": true,
        "appointment": cancelled
    })))
}
