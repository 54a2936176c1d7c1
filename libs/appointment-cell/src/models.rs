// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use doctor_cell::AvailabilityError;
use shared_models::auth::Role;
use shared_models::error::{AppError, ErrorKind};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub slot_start: NaiveTime,
    pub slot_end: NaiveTime,
    pub consultation_mode: ConsultationMode,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    /// Assigned once, on entry into the queue.
    pub queue_token: Option<u64>,
    pub called_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn day_key(&self) -> DayKey {
        DayKey {
            doctor_id: self.doctor_id,
            date: self.date,
        }
    }

    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            doctor_id: self.doctor_id,
            date: self.date,
            start_time: self.slot_start,
        }
    }

    /// Counts against slot capacity.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// One doctor's working day: the scope of a queue and its token counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayKey {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

impl DayKey {
    pub fn new(doctor_id: Uuid, date: NaiveDate) -> Self {
        Self { doctor_id, date }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.doctor_id, self.date)
    }
}

/// One slot of one doctor-day: the scope of the capacity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

impl SlotKey {
    pub fn day(&self) -> DayKey {
        DayKey::new(self.doctor_id, self.date)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}T{}", self.doctor_id, self.date, self.start_time)
    }
}

/// Canonical lifecycle states. Legacy spellings are accepted on input only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[serde(alias = "pending")]
    Requested,
    Approved,
    Rejected,
    #[serde(alias = "in_queue", alias = "waiting", alias = "Waiting")]
    Queued,
    #[serde(alias = "Called")]
    Called,
    #[serde(alias = "processing", alias = "In-Progress", alias = "in-progress")]
    InProgress,
    #[serde(alias = "completed")]
    Finished,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 8] = [
        AppointmentStatus::Requested,
        AppointmentStatus::Approved,
        AppointmentStatus::Rejected,
        AppointmentStatus::Queued,
        AppointmentStatus::Called,
        AppointmentStatus::InProgress,
        AppointmentStatus::Finished,
        AppointmentStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Finished | AppointmentStatus::Cancelled | AppointmentStatus::Rejected
        )
    }

    /// Map any status string seen in older clients onto the canonical set.
    pub fn from_legacy(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(&['-', ' '][..], "_");
        let status = match normalized.as_str() {
            "requested" | "pending" => AppointmentStatus::Requested,
            "approved" | "confirmed" => AppointmentStatus::Approved,
            "rejected" | "declined" => AppointmentStatus::Rejected,
            "queued" | "in_queue" | "waiting" => AppointmentStatus::Queued,
            "called" => AppointmentStatus::Called,
            "in_progress" | "processing" => AppointmentStatus::InProgress,
            "finished" | "completed" => AppointmentStatus::Finished,
            "cancelled" | "canceled" => AppointmentStatus::Cancelled,
            _ => return None,
        };
        Some(status)
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_legacy(s)
            .ok_or_else(|| AppointmentError::Validation(format!("Unknown appointment status: {}", s)))
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Requested => write!(f, "requested"),
            AppointmentStatus::Approved => write!(f, "approved"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Queued => write!(f, "queued"),
            AppointmentStatus::Called => write!(f, "called"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Finished => write!(f, "finished"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What moved an appointment along an edge of the lifecycle table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleTrigger {
    Approve,
    Reject,
    Cancel,
    EnterQueue,
    CallNext,
    BeginConsultation,
    Complete,
}

impl fmt::Display for LifecycleTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleTrigger::Approve => write!(f, "approve"),
            LifecycleTrigger::Reject => write!(f, "reject"),
            LifecycleTrigger::Cancel => write!(f, "cancel"),
            LifecycleTrigger::EnterQueue => write!(f, "enter queue"),
            LifecycleTrigger::CallNext => write!(f, "call"),
            LifecycleTrigger::BeginConsultation => write!(f, "begin consultation for"),
            LifecycleTrigger::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationMode {
    #[default]
    #[serde(alias = "in-person", alias = "offline")]
    InPerson,
    #[serde(alias = "online")]
    Video,
    #[serde(alias = "audio")]
    Phone,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Patient,
    Doctor,
    Admin,
    /// Automated sweeps, e.g. expiry of unapproved requests.
    System,
}

impl From<Role> for CancelledBy {
    fn from(role: Role) -> Self {
        match role {
            Role::Patient => CancelledBy::Patient,
            Role::Doctor => CancelledBy::Doctor,
            Role::Admin => CancelledBy::Admin,
        }
    }
}

impl fmt::Display for CancelledBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelledBy::Patient => write!(f, "patient"),
            CancelledBy::Doctor => write!(f, "doctor"),
            CancelledBy::Admin => write!(f, "admin"),
            CancelledBy::System => write!(f, "system"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

pub const MAX_REASON_LENGTH: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub slot_start: NaiveTime,
    /// Optional cross-check against the generated slot.
    pub slot_end: Option<NaiveTime>,
    #[serde(default)]
    pub consultation_mode: ConsultationMode,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectAppointmentRequest {
    pub reason: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Cannot {trigger} an appointment that is {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        trigger: LifecycleTrigger,
    },

    #[error("Slot {start} on {date} is full ({capacity} booking(s))")]
    SlotFull {
        date: NaiveDate,
        start: NaiveTime,
        capacity: u32,
    },

    #[error("Patient already holds a booking for slot {start} on {date}")]
    DuplicateBooking { date: NaiveDate, start: NaiveTime },

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppointmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppointmentError::NotFound(_) => ErrorKind::NotFound,
            AppointmentError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            AppointmentError::SlotFull { .. } => ErrorKind::SlotFull,
            AppointmentError::DuplicateBooking { .. } => ErrorKind::DuplicateBooking,
            AppointmentError::Availability(inner) => inner.kind(),
            AppointmentError::Validation(_) => ErrorKind::Validation,
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        AppError::domain(err.kind(), err.to_string())
    }
}
