#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use appointment_cell::*;
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

/// Collects every published event.
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
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
    pub directory: Arc<ScheduleDirectory>,
    pub store: Arc<AppointmentStore>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingPublisher>,
    pub ledger: Arc<BookingLedger>,
}

/// Monday 09:00-10:00 in 30 minute slots, clock at 08:00 that Monday.
pub async fn fixture(capacity: u32) -> Fixture {
    fixture_with_publisher(capacity, None).await
}

pub async fn fixture_with_publisher(capacity: u32, publisher: Option<Arc<dyn EventPublisher>>) -> Fixture {
    let doctor_id = Uuid::new_v4();
    let directory = Arc::new(ScheduleDirectory::new());
    directory
        .upsert(DoctorSchedule {
            doctor_id,
            working_days: vec![Weekday::Mon],
            start_time: t(9, 0),
            end_time: t(10, 0),
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
    let events = Arc::new(RecordingPublisher::default());
    let publisher = publisher.unwrap_or_else(|| events.clone() as Arc<dyn EventPublisher>);
    let ledger = Arc::new(BookingLedger::new(store.clone(), directory.clone(), clock.clone(), publisher));

    Fixture {
        doctor_id,
        directory,
        store,
        clock,
        events,
        ledger,
    }
}

pub fn request(doctor_id: Uuid, patient_id: Uuid, start: NaiveTime) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id,
        patient_id,
        date: monday(),
        slot_start: start,
        slot_end: None,
        consultation_mode: ConsultationMode::InPerson,
        reason: Some("Persistent cough".to_string()),
    }
}
