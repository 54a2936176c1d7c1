// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::{find_bookable_slot, generate_slots, AvailabilityError, ScheduleProvider, Slot};
use shared_models::events::{dispatch, DomainEvent, EventPublisher};
use shared_utils::clock::Clock;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, CancelledBy, DayKey,
    LifecycleTrigger, SlotKey, MAX_REASON_LENGTH,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::store::AppointmentStore;

/// Slot allocation and the pre-queue part of the lifecycle.
pub struct BookingLedger {
    store: Arc<AppointmentStore>,
    schedules: Arc<dyn ScheduleProvider>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    lifecycle: AppointmentLifecycleService,
}

impl BookingLedger {
    pub fn new(
        store: Arc<AppointmentStore>,
        schedules: Arc<dyn ScheduleProvider>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            schedules,
            clock,
            publisher,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub fn store(&self) -> &Arc<AppointmentStore> {
        &self.store
    }

    /// Slots for a doctor-day with live booked counts. Lock-free snapshot.
    pub async fn list_slots(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, AppointmentError> {
        let schedule = self.schedules.require_schedule(doctor_id).await?;
        let mut slots = generate_slots(&schedule, date, self.clock.local_now())?;

        let mut booked: HashMap<_, u32> = HashMap::new();
        for appointment in self.store.for_day(DayKey::new(doctor_id, date)).await {
            if appointment.is_active() {
                *booked.entry(appointment.slot_start).or_default() += 1;
            }
        }
        for slot in &mut slots {
            slot.booked_count = booked.get(&slot.start_time).copied().unwrap_or(0);
        }

        Ok(slots)
    }

    /// Reserve one place in a slot. The capacity check and the insert happen
    /// under the slot lock, so concurrent bookings can never exceed capacity.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id, date = %request.date, slot = %request.slot_start))]
    pub async fn book(&self, request: BookAppointmentRequest) -> Result<Appointment, AppointmentError> {
        let reason = normalize_reason(request.reason)?;
        let schedule = self.schedules.require_schedule(request.doctor_id).await?;

        let key = SlotKey {
            doctor_id: request.doctor_id,
            date: request.date,
            start_time: request.slot_start,
        };
        let _guard = self.store.locks().lock_slot(key).await;

        let slot = find_bookable_slot(&schedule, request.date, request.slot_start, self.clock.local_now())?;
        if request.slot_end.is_some_and(|end| end != slot.end_time) {
            return Err(AvailabilityError::SlotUnavailable {
                date: request.date,
                start: request.slot_start,
            }
            .into());
        }

        let holders = self.store.active_in_slot(key).await;
        if holders.iter().any(|a| a.patient_id == request.patient_id) {
            warn!("Patient {} already holds slot {}", request.patient_id, key);
            return Err(AppointmentError::DuplicateBooking {
                date: request.date,
                start: request.slot_start,
            });
        }
        if holders.len() as u32 >= slot.capacity {
            debug!("Slot {} full: {}/{}", key, holders.len(), slot.capacity);
            return Err(AppointmentError::SlotFull {
                date: request.date,
                start: request.slot_start,
                capacity: slot.capacity,
            });
        }

        let now = self.clock.now_utc();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            date: request.date,
            slot_start: slot.start_time,
            slot_end: slot.end_time,
            consultation_mode: request.consultation_mode,
            reason,
            status: AppointmentStatus::Requested,
            queue_token: None,
            called_at: None,
            started_at: None,
            finished_at: None,
            cancellation_reason: None,
            cancelled_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(appointment.clone()).await;

        info!(
            "Booked appointment {} for patient {} ({}/{} in slot)",
            appointment.id,
            appointment.patient_id,
            holders.len() + 1,
            slot.capacity
        );
        Ok(appointment)
    }

    pub async fn approve(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let approved = self
            .transition(appointment_id, LifecycleTrigger::Approve, |_| {})
            .await?;

        dispatch(
            self.publisher.as_ref(),
            DomainEvent::AppointmentApproved {
                appointment_id: approved.id,
                doctor_id: approved.doctor_id,
                patient_id: approved.patient_id,
                date: approved.date,
            },
        );
        Ok(approved)
    }

    pub async fn reject(&self, appointment_id: Uuid, reason: Option<String>) -> Result<Appointment, AppointmentError> {
        let reason = normalize_reason(reason)?;
        self.transition(appointment_id, LifecycleTrigger::Reject, |a| {
            a.rejection_reason = reason;
        })
        .await
    }

    /// Cancel from requested, approved or queued. The slot's capacity is
    /// released as soon as the status turns terminal.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        cancelled_by: CancelledBy,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let reason = normalize_reason(reason)?;
        let mut was_queued = false;
        let cancelled = self
            .transition(appointment_id, LifecycleTrigger::Cancel, |a| {
                was_queued = a.queue_token.is_some();
                a.cancellation_reason = reason;
                a.cancelled_by = Some(cancelled_by);
            })
            .await?;

        dispatch(
            self.publisher.as_ref(),
            DomainEvent::AppointmentCancelled {
                appointment_id: cancelled.id,
                doctor_id: cancelled.doctor_id,
                patient_id: cancelled.patient_id,
                date: cancelled.date,
                cancelled_by: cancelled_by.to_string(),
            },
        );
        if was_queued {
            let event = self.store.queue_updated_event(cancelled.day_key()).await;
            dispatch(self.publisher.as_ref(), event);
        }

        Ok(cancelled)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.require(appointment_id).await
    }

    pub async fn appointments_for_day(&self, doctor_id: Uuid, date: NaiveDate) -> Vec<Appointment> {
        self.store.for_day(DayKey::new(doctor_id, date)).await
    }

    pub async fn valid_transitions(&self, appointment_id: Uuid) -> Result<Vec<AppointmentStatus>, AppointmentError> {
        let appointment = self.store.require(appointment_id).await?;
        Ok(self.lifecycle.get_valid_transitions(appointment.status))
    }

    /// Lock day and slot, re-read, apply `trigger`, annotate, commit.
    async fn transition<F>(
        &self,
        appointment_id: Uuid,
        trigger: LifecycleTrigger,
        annotate: F,
    ) -> Result<Appointment, AppointmentError>
    where
        F: FnOnce(&mut Appointment),
    {
        let slot = self.store.require(appointment_id).await?.slot_key();
        let _guard = self.store.locks().lock_day_and_slot(slot).await;

        let current = self.store.require(appointment_id).await?;
        let mut next = self.lifecycle.apply(&current, trigger, self.clock.now_utc())?;
        annotate(&mut next);
        self.store.replace(next.clone()).await?;

        Ok(next)
    }
}

fn normalize_reason(reason: Option<String>) -> Result<Option<String>, AppointmentError> {
    let Some(reason) = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(AppointmentError::Validation(format!(
            "reason must be at most {} characters",
            MAX_REASON_LENGTH
        )));
    }
    Ok(Some(reason))
}
