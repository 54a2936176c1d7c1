use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// One waiting patient in a doctor-day queue, in token order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingEntry {
    pub queue_token: u64,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
}

/// Events emitted after a state change has been committed. Delivery is the
/// job of an external push component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    AppointmentApproved {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
    },
    AppointmentCancelled {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        cancelled_by: String,
    },
    PatientCalled {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        queue_token: u64,
        called_at: DateTime<Utc>,
    },
    ConsultationFinished {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        finished_at: DateTime<Utc>,
    },
    QueueUpdated {
        doctor_id: Uuid,
        date: NaiveDate,
        waiting: Vec<WaitingEntry>,
        now_serving: Option<u64>,
    },
}

impl DomainEvent {
    pub fn doctor_day(&self) -> (Uuid, NaiveDate) {
        match self {
            DomainEvent::AppointmentApproved { doctor_id, date, .. }
            | DomainEvent::AppointmentCancelled { doctor_id, date, .. }
            | DomainEvent::PatientCalled { doctor_id, date, .. }
            | DomainEvent::ConsultationFinished { doctor_id, date, .. }
            | DomainEvent::QueueUpdated { doctor_id, date, .. } => (*doctor_id, *date),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::AppointmentApproved { .. } => "appointment_approved",
            DomainEvent::AppointmentCancelled { .. } => "appointment_cancelled",
            DomainEvent::PatientCalled { .. } => "patient_called",
            DomainEvent::ConsultationFinished { .. } => "consultation_finished",
            DomainEvent::QueueUpdated { .. } => "queue_updated",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("Notification channel closed")]
    ChannelClosed,

    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),
}

/// Seam to the notification dispatcher. A failed publish never rolls back
/// the transition that produced the event.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent) -> Result<(), PublishError>;
}

/// Publisher for deployments and tests that have no subscribers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: DomainEvent) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Publish after commit. Failures are logged and swallowed.
pub fn dispatch(publisher: &dyn EventPublisher, event: DomainEvent) {
    let name = event.name();
    let (doctor_id, date) = event.doctor_day();
    match publisher.publish(event) {
        Ok(()) => debug!("Published {} for doctor {} on {}", name, doctor_id, date),
        Err(e) => warn!("Failed to publish {} for doctor {} on {}: {}", name, doctor_id, date, e),
    }
}
