// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, LifecycleTrigger};

/// One permitted edge of the appointment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: AppointmentStatus,
    pub trigger: LifecycleTrigger,
    pub to: AppointmentStatus,
}

const fn rule(from: AppointmentStatus, trigger: LifecycleTrigger, to: AppointmentStatus) -> TransitionRule {
    TransitionRule { from, trigger, to }
}

/// The complete transition table. Anything not listed here is refused.
pub const TRANSITIONS: [TransitionRule; 9] = [
    rule(AppointmentStatus::Requested, LifecycleTrigger::Approve, AppointmentStatus::Approved),
    rule(AppointmentStatus::Requested, LifecycleTrigger::Reject, AppointmentStatus::Rejected),
    rule(AppointmentStatus::Requested, LifecycleTrigger::Cancel, AppointmentStatus::Cancelled),
    rule(AppointmentStatus::Approved, LifecycleTrigger::Cancel, AppointmentStatus::Cancelled),
    rule(AppointmentStatus::Queued, LifecycleTrigger::Cancel, AppointmentStatus::Cancelled),
    rule(AppointmentStatus::Approved, LifecycleTrigger::EnterQueue, AppointmentStatus::Queued),
    rule(AppointmentStatus::Queued, LifecycleTrigger::CallNext, AppointmentStatus::Called),
    rule(AppointmentStatus::Called, LifecycleTrigger::BeginConsultation, AppointmentStatus::InProgress),
    rule(AppointmentStatus::InProgress, LifecycleTrigger::Complete, AppointmentStatus::Finished),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the target status for `trigger`, or refuse the edge.
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        trigger: LifecycleTrigger,
    ) -> Result<AppointmentStatus, AppointmentError> {
        debug!("Validating {} on a {} appointment", trigger, current_status);

        match TRANSITIONS
            .iter()
            .find(|r| r.from == current_status && r.trigger == trigger)
        {
            Some(r) => Ok(r.to),
            None => {
                warn!("Invalid status transition attempted: {} on {}", trigger, current_status);
                Err(AppointmentError::InvalidTransition {
                    from: current_status,
                    trigger,
                })
            }
        }
    }

    /// Every status reachable in one step from `current_status`.
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        TRANSITIONS
            .iter()
            .filter(|r| r.from == current_status)
            .map(|r| r.to)
            .collect()
    }

    /// Produce the post-transition copy of `appointment`. The caller commits it.
    pub fn apply(
        &self,
        appointment: &Appointment,
        trigger: LifecycleTrigger,
        at: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let target = self.validate_status_transition(appointment.status, trigger)?;

        let mut next = appointment.clone();
        next.status = target;
        next.updated_at = at;
        match target {
            AppointmentStatus::Called => next.called_at = Some(at),
            AppointmentStatus::InProgress => next.started_at = Some(at),
            AppointmentStatus::Finished => next.finished_at = Some(at),
            _ => {}
        }

        info!(
            "Appointment {} transitioned {} -> {}",
            appointment.id, appointment.status, target
        );
        Ok(next)
    }
}
