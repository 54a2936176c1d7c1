use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::AppointmentError;
use doctor_cell::AvailabilityError;
use shared_models::error::{AppError, ErrorKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error("Appointment {0} is not waiting in a queue")]
    NotInQueue(Uuid),

    #[error("Appointment {appointment_id} is for {date}; the queue only opens on that day (today is {today})")]
    NotQueueDay {
        appointment_id: Uuid,
        date: NaiveDate,
        today: NaiveDate,
    },

    #[error(transparent)]
    Appointment(#[from] AppointmentError),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::NotInQueue(_) => ErrorKind::NotFound,
            QueueError::NotQueueDay { .. } => ErrorKind::InvalidTransition,
            QueueError::Appointment(inner) => inner.kind(),
        }
    }
}

impl From<AvailabilityError> for QueueError {
    fn from(err: AvailabilityError) -> Self {
        QueueError::Appointment(AppointmentError::Availability(err))
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        AppError::domain(err.kind(), err.to_string())
    }
}
