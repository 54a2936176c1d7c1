use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::{AppError, ErrorKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvailabilityError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("No schedule found for doctor {0}")]
    ScheduleNotFound(Uuid),

    #[error("Doctor offers no slot starting at {start} on {date}")]
    SlotUnavailable { date: NaiveDate, start: NaiveTime },

    #[error("Slot starting at {start} on {date} is in the past")]
    SlotInPast { date: NaiveDate, start: NaiveTime },
}

impl AvailabilityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AvailabilityError::InvalidSchedule(_) => ErrorKind::InvalidSchedule,
            AvailabilityError::ScheduleNotFound(_) => ErrorKind::NotFound,
            AvailabilityError::SlotUnavailable { .. } => ErrorKind::SlotUnavailable,
            AvailabilityError::SlotInPast { .. } => ErrorKind::SlotInPast,
        }
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        AppError::domain(err.kind(), err.to_string())
    }
}
