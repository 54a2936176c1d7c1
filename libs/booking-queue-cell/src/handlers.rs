use std::sync::Arc;

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::{Json, Response},
    Extension,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use appointment_cell::handlers::require_participant;
use shared_config::AppConfig;
use shared_models::{
    auth::{Role, User},
    error::AppError,
};
use shared_utils::extractor::{require_role, require_self_or_admin};

use crate::services::feed::{stream_day_feed, stream_global_feed};
use crate::services::notifications::BroadcastNotifier;
use crate::services::queue::QueueEngine;

pub struct QueueState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<QueueEngine>,
    pub notifier: Arc<BroadcastNotifier>,
}

async fn require_treating_doctor(state: &QueueState, user: &User, appointment_id: Uuid) -> Result<(), AppError> {
    require_role(user, &[Role::Doctor, Role::Admin])?;
    let appointment = state.engine.appointment(appointment_id).await?;
    require_self_or_admin(user, appointment.doctor_id)
}

/// Check an approved patient into today's queue.
pub async fn enter_queue(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.engine.appointment(appointment_id).await?;
    require_participant(&user, &appointment)?;

    let token = state.engine.enter_queue(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": appointment_id,
        "queue_token": token
    })))
}

pub async fn call_next(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Admin])?;
    require_self_or_admin(&user, doctor_id)?;

    let called = state.engine.call_next(doctor_id, date).await?;
    if called.is_none() {
        info!("Call-next on empty queue for doctor {} on {}", doctor_id, date);
    }

    Ok(Json(json!({ "appointment": called })))
}

pub async fn begin_consultation(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_treating_doctor(&state, &user, appointment_id).await?;

    let appointment = state.engine.begin_consultation(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn complete_appointment(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_treating_doctor(&state, &user, appointment_id).await?;

    let appointment = state.engine.complete(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn get_position(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.engine.appointment(appointment_id).await?;
    require_participant(&user, &appointment)?;

    let position = state.engine.get_position(appointment_id).await?;
    Ok(Json(json!({ "position": position })))
}

pub async fn get_queue(
    State(state): State<Arc<QueueState>>,
    Extension(_user): Extension<User>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<Json<Value>, AppError> {
    let snapshot = state.engine.queue_snapshot(doctor_id, date).await?;
    Ok(Json(json!({ "queue": snapshot })))
}

/// Admin only.
pub async fn get_queue_stats(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let stats = state.engine.stats().await;
    Ok(Json(json!({
        "stats": stats,
        "live_day_feeds": state.notifier.active_days().len(),
        "settings": {
            "average_consultation_minutes": state.engine.settings().average_consultation_minutes,
            "auto_start_on_call": state.engine.settings().auto_start_on_call
        }
    })))
}

/// WebSocket feed of one doctor-day's events (queue updates, calls,
/// approvals, cancellations). The subscription is taken before the upgrade
/// so nothing published after the handshake is missed.
pub async fn day_feed(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path((doctor_id, date)): Path<(Uuid, NaiveDate)>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    state.engine.require_doctor(doctor_id).await?;

    let feed = state.notifier.subscribe_day(doctor_id, date);
    info!("User {} subscribed to queue feed for doctor {} on {}", user.id, doctor_id, date);

    let notifier = state.notifier.clone();
    Ok(ws.on_upgrade(move |socket| stream_day_feed(socket, notifier, doctor_id, date, feed)))
}

/// Admin only: every event from every doctor-day.
pub async fn global_feed(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    require_role(&user, &[Role::Admin])?;

    let feed = state.notifier.subscribe_global();
    info!("User {} subscribed to the global queue feed", user.id);

    Ok(ws.on_upgrade(move |socket| stream_global_feed(socket, feed)))
}
