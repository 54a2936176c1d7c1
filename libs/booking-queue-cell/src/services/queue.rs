use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use appointment_cell::{
    Appointment, AppointmentLifecycleService, AppointmentStatus, AppointmentStore, DayKey, LifecycleTrigger,
};
use doctor_cell::ScheduleProvider;
use shared_models::events::{dispatch, DomainEvent, EventPublisher, WaitingEntry};
use shared_utils::clock::Clock;

use crate::error::QueueError;
use crate::models::{QueuePosition, QueueSettings, QueueSnapshot, QueueStats};

/// Day-of-visit serving queue. Every write runs under the doctor-day lock,
/// so token issue and call-next are serialized per doctor and date.
pub struct QueueEngine {
    store: Arc<AppointmentStore>,
    schedules: Arc<dyn ScheduleProvider>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    lifecycle: AppointmentLifecycleService,
    settings: QueueSettings,
    stats: RwLock<QueueStats>,
}

impl QueueEngine {
    pub fn new(
        store: Arc<AppointmentStore>,
        schedules: Arc<dyn ScheduleProvider>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        settings: QueueSettings,
    ) -> Self {
        Self {
            store,
            schedules,
            clock,
            publisher,
            lifecycle: AppointmentLifecycleService::new(),
            settings,
            stats: RwLock::new(QueueStats::default()),
        }
    }

    pub fn settings(&self) -> QueueSettings {
        self.settings
    }

    pub async fn require_doctor(&self, doctor_id: Uuid) -> Result<(), QueueError> {
        self.schedules.require_schedule(doctor_id).await?;
        Ok(())
    }

    pub async fn appointment(&self, appointment_id: Uuid) -> Result<Appointment, QueueError> {
        Ok(self.store.require(appointment_id).await?)
    }

    /// Move an approved appointment into today's queue and issue its token.
    ///
    /// The status and the day are checked before the counter is touched, so a
    /// refused entry never burns a token.
    #[instrument(skip(self))]
    pub async fn enter_queue(&self, appointment_id: Uuid) -> Result<u64, QueueError> {
        let day = self.store.require(appointment_id).await?.day_key();
        let guard = self.store.locks().lock_day(day).await;

        let current = self.store.require(appointment_id).await?;
        self.lifecycle
            .validate_status_transition(current.status, LifecycleTrigger::EnterQueue)?;

        let today = self.clock.today();
        if current.date != today {
            warn!("Appointment {} is for {}, not today ({})", appointment_id, current.date, today);
            return Err(QueueError::NotQueueDay {
                appointment_id,
                date: current.date,
                today,
            });
        }

        let mut next = self
            .lifecycle
            .apply(&current, LifecycleTrigger::EnterQueue, self.clock.now_utc())?;
        let token = self.store.next_token(day).await;
        next.queue_token = Some(token);
        self.store.replace(next).await?;

        let update = self.store.queue_updated_event(day).await;
        drop(guard);

        self.stats.write().await.entered += 1;
        info!("Appointment {} entered queue {} with token {}", appointment_id, day, token);
        dispatch(self.publisher.as_ref(), update);

        Ok(token)
    }

    /// Call the lowest-token waiting patient. `None` means the queue is empty.
    #[instrument(skip(self))]
    pub async fn call_next(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Option<Appointment>, QueueError> {
        self.schedules.require_schedule(doctor_id).await?;

        let day = DayKey::new(doctor_id, date);
        let guard = self.store.locks().lock_day(day).await;

        let Some(head) = self.store.waiting_line(day).await.into_iter().next() else {
            drop(guard);
            self.stats.write().await.empty_calls += 1;
            debug!("Queue {} is empty", day);
            return Ok(None);
        };

        let now = self.clock.now_utc();
        let mut called = self.lifecycle.apply(&head, LifecycleTrigger::CallNext, now)?;
        if self.settings.auto_start_on_call {
            called = self
                .lifecycle
                .apply(&called, LifecycleTrigger::BeginConsultation, now)?;
        }
        self.store.replace(called.clone()).await?;

        let update = self.store.queue_updated_event(day).await;
        drop(guard);

        self.stats.write().await.called += 1;
        info!(
            "Called token {:?} (appointment {}) for {}",
            called.queue_token, called.id, day
        );

        if let Some(queue_token) = called.queue_token {
            dispatch(
                self.publisher.as_ref(),
                DomainEvent::PatientCalled {
                    appointment_id: called.id,
                    doctor_id,
                    patient_id: called.patient_id,
                    date,
                    queue_token,
                    called_at: now,
                },
            );
        }
        dispatch(self.publisher.as_ref(), update);

        Ok(Some(called))
    }

    pub async fn begin_consultation(&self, appointment_id: Uuid) -> Result<Appointment, QueueError> {
        let day = self.store.require(appointment_id).await?.day_key();
        let _guard = self.store.locks().lock_day(day).await;

        let current = self.store.require(appointment_id).await?;
        let started = self
            .lifecycle
            .apply(&current, LifecycleTrigger::BeginConsultation, self.clock.now_utc())?;
        self.store.replace(started.clone()).await?;

        Ok(started)
    }

    /// Finish an in-progress consultation. Takes the slot lock as well, since
    /// the appointment stops counting against its slot.
    #[instrument(skip(self))]
    pub async fn complete(&self, appointment_id: Uuid) -> Result<Appointment, QueueError> {
        let slot = self.store.require(appointment_id).await?.slot_key();
        let guard = self.store.locks().lock_day_and_slot(slot).await;

        let current = self.store.require(appointment_id).await?;
        let finished = self
            .lifecycle
            .apply(&current, LifecycleTrigger::Complete, self.clock.now_utc())?;
        self.store.replace(finished.clone()).await?;

        let update = self.store.queue_updated_event(slot.day()).await;
        drop(guard);

        self.stats.write().await.completed += 1;
        if let Some(finished_at) = finished.finished_at {
            dispatch(
                self.publisher.as_ref(),
                DomainEvent::ConsultationFinished {
                    appointment_id: finished.id,
                    doctor_id: finished.doctor_id,
                    patient_id: finished.patient_id,
                    date: finished.date,
                    finished_at,
                },
            );
        }
        dispatch(self.publisher.as_ref(), update);

        Ok(finished)
    }

    /// Lock-free snapshot of one appointment's place in line.
    pub async fn get_position(&self, appointment_id: Uuid) -> Result<QueuePosition, QueueError> {
        let appointment = self.store.require(appointment_id).await?;
        let own_token = match (appointment.status, appointment.queue_token) {
            (AppointmentStatus::Queued, Some(token)) => token,
            _ => return Err(QueueError::NotInQueue(appointment_id)),
        };

        let patients_ahead = self
            .store
            .waiting_line(appointment.day_key())
            .await
            .iter()
            .filter(|a| a.queue_token.is_some_and(|token| token < own_token))
            .count() as u32;

        Ok(QueuePosition {
            appointment_id,
            queue_token: own_token,
            position: patients_ahead + 1,
            patients_ahead,
            estimated_wait_minutes: patients_ahead.saturating_mul(self.settings.average_consultation_minutes),
        })
    }

    pub async fn queue_snapshot(&self, doctor_id: Uuid, date: NaiveDate) -> Result<QueueSnapshot, QueueError> {
        self.schedules.require_schedule(doctor_id).await?;
        let day = DayKey::new(doctor_id, date);

        let appointments = self.store.for_day(day).await;
        let finished_count = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Finished)
            .count() as u32;

        let mut waiting: Vec<WaitingEntry> = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Queued)
            .filter_map(|a| {
                a.queue_token.map(|queue_token| WaitingEntry {
                    queue_token,
                    appointment_id: a.id,
                    patient_id: a.patient_id,
                })
            })
            .collect();
        waiting.sort_by_key(|entry| entry.queue_token);

        Ok(QueueSnapshot {
            doctor_id,
            date,
            waiting,
            now_serving: self.store.now_serving(day).await,
            last_token_issued: self.store.last_token(day).await,
            finished_count,
            average_consultation_minutes: self.settings.average_consultation_minutes,
            taken_at: self.clock.now_utc(),
        })
    }

    pub async fn stats(&self) -> QueueStats {
        self.stats.read().await.clone()
    }
}
