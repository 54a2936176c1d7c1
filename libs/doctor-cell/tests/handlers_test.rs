use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::{NaiveTime, Weekday};
use uuid::Uuid;

use doctor_cell::handlers::{get_schedule, remove_schedule, upsert_schedule, DoctorState};
use doctor_cell::*;
use shared_models::error::{AppError, ErrorKind};
use shared_utils::test_utils::{TestConfig, TestUser};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn state() -> Arc<DoctorState> {
    Arc::new(DoctorState {
        config: TestConfig::default().to_arc(),
        directory: Arc::new(ScheduleDirectory::new()),
    })
}

fn request(start: NaiveTime, end: NaiveTime) -> UpsertScheduleRequest {
    UpsertScheduleRequest {
        working_days: vec![Weekday::Wed, Weekday::Mon, Weekday::Mon],
        start_time: start,
        end_time: end,
        slot_duration_minutes: 30,
        breaks: vec![],
        max_appointments_per_slot: Some(2),
        unavailable_dates: vec![],
    }
}

#[tokio::test]
async fn test_doctor_sets_own_schedule() {
    let state = state();
    let doctor = TestUser::doctor("doc@example.com");

    let result = upsert_schedule(
        State(state.clone()),
        Extension(doctor.to_user()),
        Path(doctor.uuid()),
        Json(request(t(9, 0), t(12, 0))),
    )
    .await;
    assert!(result.is_ok());

    let stored = state.directory.require_schedule(doctor.uuid()).await.unwrap();
    assert_eq!(stored.working_days, vec![Weekday::Mon, Weekday::Wed]);
    assert_eq!(stored.max_appointments_per_slot, 2);
    assert!(stored.updated_at.is_some());
}

#[tokio::test]
async fn test_doctor_cannot_set_someone_elses_schedule() {
    let state = state();
    let doctor = TestUser::doctor("doc@example.com");

    let result = upsert_schedule(
        State(state.clone()),
        Extension(doctor.to_user()),
        Path(Uuid::new_v4()),
        Json(request(t(9, 0), t(12, 0))),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
    assert!(state.directory.is_empty().await);
}

#[tokio::test]
async fn test_patient_cannot_set_schedule_and_admin_can() {
    let state = state();
    let doctor_id = Uuid::new_v4();
    let patient = TestUser::with_id(doctor_id, "patient");

    let denied = upsert_schedule(
        State(state.clone()),
        Extension(patient.to_user()),
        Path(doctor_id),
        Json(request(t(9, 0), t(12, 0))),
    )
    .await;
    assert_matches!(denied, Err(AppError::Forbidden(_)));

    let admin = TestUser::admin("admin@example.com");
    let allowed = upsert_schedule(
        State(state.clone()),
        Extension(admin.to_user()),
        Path(doctor_id),
        Json(request(t(9, 0), t(12, 0))),
    )
    .await;
    assert!(allowed.is_ok());
    assert_eq!(state.directory.len().await, 1);
}

#[tokio::test]
async fn test_invalid_schedule_is_rejected_with_stable_code() {
    let state = state();
    let doctor = TestUser::doctor("doc@example.com");

    let result = upsert_schedule(
        State(state.clone()),
        Extension(doctor.to_user()),
        Path(doctor.uuid()),
        Json(request(t(12, 0), t(9, 0))),
    )
    .await;

    assert_matches!(result, Err(AppError::Domain { kind: ErrorKind::InvalidSchedule, .. }));
}

#[tokio::test]
async fn test_out_of_range_slot_duration_is_refused_at_upsert() {
    let state = state();
    let doctor = TestUser::doctor("doc@example.com");
    let mut huge = request(t(9, 0), t(17, 0));
    huge.slot_duration_minutes = i64::MAX;

    let result = upsert_schedule(
        State(state.clone()),
        Extension(doctor.to_user()),
        Path(doctor.uuid()),
        Json(huge),
    )
    .await;

    assert_matches!(result, Err(AppError::Domain { kind: ErrorKind::InvalidSchedule, .. }));
    assert!(state.directory.is_empty().await);
}

#[tokio::test]
async fn test_missing_schedule_is_not_found() {
    let state = state();
    let user = TestUser::patient("pat@example.com");

    let result = get_schedule(State(state), Extension(user.to_user()), Path(Uuid::new_v4())).await;

    assert_matches!(result, Err(AppError::Domain { kind: ErrorKind::NotFound, .. }));
}

#[tokio::test]
async fn test_doctor_removes_own_schedule() {
    let state = state();
    let doctor = TestUser::doctor("doc@example.com");
    let other = TestUser::doctor("other@example.com");
    state
        .directory
        .upsert(request(t(9, 0), t(10, 0)).into_schedule(doctor.uuid()))
        .await
        .unwrap();

    let denied = remove_schedule(State(state.clone()), Extension(other.to_user()), Path(doctor.uuid())).await;
    assert_matches!(denied, Err(AppError::Forbidden(_)));

    let removed = remove_schedule(State(state.clone()), Extension(doctor.to_user()), Path(doctor.uuid()))
        .await
        .unwrap();
    assert_eq!(removed.0["success"], true);
    assert!(state.directory.is_empty().await);

    let again = remove_schedule(State(state), Extension(doctor.to_user()), Path(doctor.uuid())).await;
    assert_matches!(again, Err(AppError::Domain { kind: ErrorKind::NotFound, .. }));
}

#[tokio::test]
async fn test_remove_schedule() {
    let directory = ScheduleDirectory::new();
    let doctor_id = Uuid::new_v4();
    directory
        .upsert(request(t(9, 0), t(10, 0)).into_schedule(doctor_id))
        .await
        .unwrap();

    assert!(directory.remove(doctor_id).await.is_some());
    assert_matches!(
        directory.require_schedule(doctor_id).await,
        Err(AvailabilityError::ScheduleNotFound(id)) if id == doctor_id
    );
}
