use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::{require_role, require_self_or_admin};

use crate::error::AvailabilityError;
use crate::models::UpsertScheduleRequest;
use crate::services::directory::{ScheduleDirectory, ScheduleProvider};

pub struct DoctorState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<ScheduleDirectory>,
}

/// Replace a doctor's weekly schedule (the doctor themself or an admin).
pub async fn upsert_schedule(
    State(state): State<Arc<DoctorState>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpsertScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Admin])?;
    require_self_or_admin(&user, doctor_id)?;

    info!("Schedule update for doctor {} by user {}", doctor_id, user.id);
    let schedule = state.directory.upsert(request.into_schedule(doctor_id)).await?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

pub async fn get_schedule(
    State(state): State<Arc<DoctorState>>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedule = state.directory.require_schedule(doctor_id).await?;
    Ok(Json(json!({ "schedule": schedule })))
}

/// Take a doctor off the calendar. Existing appointments are left alone.
pub async fn remove_schedule(
    State(state): State<Arc<DoctorState>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Admin])?;
    require_self_or_admin(&user, doctor_id)?;

    state
        .directory
        .remove(doctor_id)
        .await
        .ok_or(AvailabilityError::ScheduleNotFound(doctor_id))?;
    info!("Schedule for doctor {} removed by user {}", doctor_id, user.id);

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id
    })))
}
