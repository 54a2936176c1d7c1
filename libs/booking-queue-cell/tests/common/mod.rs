#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use appointment_cell::{Appointment, AppointmentStore, BookAppointmentRequest, BookingLedger, ConsultationMode};
use booking_queue_cell::*;
use doctor_cell::{DoctorSchedule, ScheduleDirectory};
use shared_models::events::{DomainEvent, EventPublisher, PublishError};
use shared_utils::clock::FixedClock;

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// 2026-10-12 is a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

pub struct Fixture {
    pub doctor_id: Uuid,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingPublisher>,
    pub ledger: Arc<BookingLedger>,
    pub engine: Arc<QueueEngine>,
}

/// Monday 09:00-12:00 in 30 minute slots with `capacity` places each; the
/// clock reads 08:00 that Monday.
pub async fn fixture(capacity: u32, settings: QueueSettings) -> Fixture {
    let events = Arc::new(RecordingPublisher::default());
    build(capacity, settings, events.clone(), events).await
}

/// Same as `fixture`, but events go to `publisher`; `Fixture::events` stays empty.
pub async fn fixture_with_publisher(
    capacity: u32,
    settings: QueueSettings,
    publisher: Arc<dyn EventPublisher>,
) -> Fixture {
    build(capacity, settings, publisher, Arc::new(RecordingPublisher::default())).await
}

async fn build(
    capacity: u32,
    settings: QueueSettings,
    publisher: Arc<dyn EventPublisher>,
    events: Arc<RecordingPublisher>,
) -> Fixture {
    let doctor_id = Uuid::new_v4();
    let directory = Arc::new(ScheduleDirectory::new());
    directory
        .upsert(DoctorSchedule {
            doctor_id,
            working_days: vec![Weekday::Mon, Weekday::Tue],
            start_time: t(9, 0),
            end_time: t(12, 0),
            slot_duration_minutes: 30,
            breaks: vec![],
            max_appointments_per_slot: capacity,
            unavailable_dates: vec![],
            updated_at: None,
        })
        .await
        .unwrap();

    let store = Arc::new(AppointmentStore::new());
    let clock = Arc::new(FixedClock::at(monday().and_time(t(8, 0))));

    let ledger = Arc::new(BookingLedger::new(
        store.clone(),
        directory.clone(),
        clock.clone(),
        publisher.clone(),
    ));
    let engine = Arc::new(QueueEngine::new(store, directory, clock.clone(), publisher, settings));

    Fixture {
        doctor_id,
        clock,
        events,
        ledger,
        engine,
    }
}

pub fn request(doctor_id: Uuid, date: NaiveDate, start: NaiveTime) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id,
        patient_id: Uuid::new_v4(),
        date,
        slot_start: start,
        slot_end: None,
        consultation_mode: ConsultationMode::InPerson,
        reason: None,
    }
}

/// Book and approve one appointment on `date` at `start`.
pub async fn approved(fx: &Fixture, date: NaiveDate, start: NaiveTime) -> Appointment {
    let booked = fx.ledger.book(request(fx.doctor_id, date, start)).await.unwrap();
    fx.ledger.approve(booked.id).await.unwrap()
}
