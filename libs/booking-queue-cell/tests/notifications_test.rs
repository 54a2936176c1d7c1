use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use booking_queue_cell::BroadcastNotifier;
use shared_models::events::{DomainEvent, EventPublisher, WaitingEntry};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
}

fn called(doctor_id: Uuid, date: NaiveDate) -> DomainEvent {
    DomainEvent::PatientCalled {
        appointment_id: Uuid::new_v4(),
        doctor_id,
        patient_id: Uuid::new_v4(),
        date,
        queue_token: 1,
        called_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_day_subscribers_only_see_their_day() {
    let notifier = BroadcastNotifier::new();
    let doctor_id = Uuid::new_v4();
    let mut today = notifier.subscribe_day(doctor_id, monday());
    let mut other_doctor = notifier.subscribe_day(Uuid::new_v4(), monday());

    notifier.publish(called(doctor_id, monday())).unwrap();

    let message = today.recv().await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&message).unwrap();
    assert_eq!(value["type"], "patient_called");
    assert_eq!(value["queue_token"], 1);
    assert!(other_doctor.try_recv().is_err());
}

#[tokio::test]
async fn test_global_feed_wraps_every_event() {
    let notifier = BroadcastNotifier::new();
    let mut global = notifier.subscribe_global();
    let doctor_id = Uuid::new_v4();

    notifier
        .publish(DomainEvent::QueueUpdated {
            doctor_id,
            date: monday(),
            waiting: vec![WaitingEntry {
                queue_token: 4,
                appointment_id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
            }],
            now_serving: Some(3),
        })
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&global.recv().await.unwrap()).unwrap();
    assert_eq!(value["doctor_id"], doctor_id.to_string());
    assert_eq!(value["event"]["type"], "queue_updated");
    assert_eq!(value["event"]["waiting"][0]["queue_token"], 4);
}

#[tokio::test]
async fn test_publishing_without_subscribers_is_not_an_error() {
    let notifier = BroadcastNotifier::new();
    assert!(notifier.publish(called(Uuid::new_v4(), monday())).is_ok());

    let doctor_id = Uuid::new_v4();
    drop(notifier.subscribe_day(doctor_id, monday()));
    assert!(notifier.publish(called(doctor_id, monday())).is_ok());
}

#[tokio::test]
async fn test_day_channel_is_released_only_when_unsubscribed() {
    let notifier = BroadcastNotifier::new();
    let doctor_id = Uuid::new_v4();
    let first = notifier.subscribe_day(doctor_id, monday());
    let second = notifier.subscribe_day(doctor_id, monday());
    assert_eq!(notifier.active_days().len(), 1);

    drop(first);
    notifier.release_day(doctor_id, monday());
    assert_eq!(notifier.active_days().len(), 1);

    drop(second);
    notifier.release_day(doctor_id, monday());
    assert!(notifier.active_days().is_empty());
}
