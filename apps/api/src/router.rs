use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;
use appointment_cell::{AppointmentStore, BookingLedger};
use booking_queue_cell::handlers::QueueState;
use booking_queue_cell::{queue_routes, BroadcastNotifier, QueueEngine, QueueSettings};
use doctor_cell::handlers::DoctorState;
use doctor_cell::router::doctor_routes;
use doctor_cell::ScheduleDirectory;
use shared_config::AppConfig;
use shared_utils::clock::Clock;

/// Wire the engine together. Ledger and queue share one store, so they share
/// its locks and token counters.
pub fn create_router(config: Arc<AppConfig>, clock: Arc<dyn Clock>) -> Router {
    let directory = Arc::new(ScheduleDirectory::new());
    let store = Arc::new(AppointmentStore::new());
    let notifier = Arc::new(BroadcastNotifier::new());

    let ledger = Arc::new(BookingLedger::new(
        store.clone(),
        directory.clone(),
        clock.clone(),
        notifier.clone(),
    ));
    let engine = Arc::new(QueueEngine::new(
        store,
        directory.clone(),
        clock,
        notifier.clone(),
        QueueSettings::from(config.as_ref()),
    ));
    info!(
        "Queue engine ready (average consultation {} min, auto start on call: {})",
        config.average_consultation_minutes, config.auto_start_on_call
    );

    Router::new()
        .route("/", get(|| async { "Clinic queue API is running!" }))
        .nest(
            "/doctors",
            doctor_routes(Arc::new(DoctorState {
                config: config.clone(),
                directory,
            })),
        )
        .nest(
            "/appointments",
            appointment_routes(Arc::new(AppointmentState {
                config: config.clone(),
                ledger,
            })),
        )
        .nest(
            "/queue",
            queue_routes(Arc::new(QueueState {
                config,
                engine,
                notifier,
            })),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use chrono::{NaiveDate, NaiveTime};
    use http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use shared_utils::clock::FixedClock;
    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

    struct Harness {
        app: Router,
        secret: String,
    }

    impl Harness {
        fn new() -> Self {
            let test_config = TestConfig::default();
            // 2026-10-12 is a Monday.
            let clock = Arc::new(FixedClock::at(
                NaiveDate::from_ymd_opt(2026, 10, 12)
                    .unwrap()
                    .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
            ));
            Self {
                app: create_router(test_config.to_arc(), clock),
                secret: test_config.jwt_secret,
            }
        }

        async fn send(&self, method: &str, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(user) = user {
                builder = builder.header("Authorization", JwtTestUtils::bearer(user, &self.secret));
            }
            let request = match body {
                Some(body) => builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }
    }

    #[tokio::test]
    async fn requests_without_a_token_are_unauthorized() {
        let harness = Harness::new();

        let (status, body) = harness
            .send("GET", &format!("/queue/doctors/{}/2026-10-12", Uuid::new_v4()), None, None)
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthorized");
    }

    #[tokio::test]
    async fn schedule_to_call_next_over_http() {
        let harness = Harness::new();
        let doctor_id = Uuid::new_v4();
        let doctor = TestUser::with_id(doctor_id, "doctor");
        let patient = TestUser::patient("pat@example.com");
        let latecomer = TestUser::patient("late@example.com");

        let (status, _) = harness
            .send(
                "PUT",
                &format!("/doctors/{}/schedule", doctor_id),
                Some(&doctor),
                Some(json!({
                    "working_days": ["Mon"],
                    "start_time": "09:00:00",
                    "end_time": "10:00:00",
                    "slot_duration_minutes": 30
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, slots) = harness
            .send("GET", &format!("/appointments/slots/{}/2026-10-12", doctor_id), Some(&patient), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(slots["total"], 2);

        let booking = |patient_id: Uuid| {
            json!({
                "doctor_id": doctor_id,
                "patient_id": patient_id,
                "date": "2026-10-12",
                "slot_start": "09:00:00"
            })
        };
        let (status, booked) = harness
            .send("POST", "/appointments", Some(&patient), Some(booking(patient.uuid())))
            .await;
        assert_eq!(status, StatusCode::OK);
        let appointment_id = booked["appointment"]["id"].as_str().unwrap().to_string();

        let (status, full) = harness
            .send("POST", "/appointments", Some(&latecomer), Some(booking(latecomer.uuid())))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(full["code"], "slot_full");

        let (status, _) = harness
            .send("POST", &format!("/appointments/{}/approve", appointment_id), Some(&doctor), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, entered) = harness
            .send("POST", &format!("/queue/appointments/{}/enter", appointment_id), Some(&patient), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entered["queue_token"], 1);

        let call_uri = format!("/queue/doctors/{}/2026-10-12/call-next", doctor_id);
        let (status, called) = harness.send("POST", &call_uri, Some(&doctor), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(called["appointment"]["id"], appointment_id.as_str());
        assert_eq!(called["appointment"]["status"], "called");

        let (status, empty) = harness.send("POST", &call_uri, Some(&doctor), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(empty["appointment"].is_null());

        let (status, position) = harness
            .send("GET", &format!("/queue/appointments/{}/position", appointment_id), Some(&patient), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(position["code"], "not_found");
    }
}
