use std::collections::HashMap;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use shared_models::events::{DomainEvent, WaitingEntry};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, DayKey, SlotKey};
use crate::services::consistency::SchedulingLocks;

#[derive(Default)]
struct LedgerTables {
    appointments: HashMap<Uuid, Appointment>,
    by_day: HashMap<DayKey, Vec<Uuid>>,
}

/// Authoritative appointment storage shared by the ledger and the queue.
///
/// Reads take a snapshot under the read lock and never wait on scheduling
/// locks. Writers must hold the scheduling lock for the keys they touch.
#[derive(Default)]
pub struct AppointmentStore {
    tables: RwLock<LedgerTables>,
    tokens: Mutex<HashMap<DayKey, u64>>,
    locks: SchedulingLocks,
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locks(&self) -> &SchedulingLocks {
        &self.locks
    }

    pub async fn get(&self, id: Uuid) -> Option<Appointment> {
        self.tables.read().await.appointments.get(&id).cloned()
    }

    pub async fn require(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.get(id).await.ok_or(AppointmentError::NotFound(id))
    }

    /// Every appointment of a doctor-day in booking order, terminal ones included.
    pub async fn for_day(&self, day: DayKey) -> Vec<Appointment> {
        let tables = self.tables.read().await;
        tables
            .by_day
            .get(&day)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.appointments.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Appointments currently holding capacity in `slot`.
    pub async fn active_in_slot(&self, slot: SlotKey) -> Vec<Appointment> {
        self.for_day(slot.day())
            .await
            .into_iter()
            .filter(|a| a.slot_start == slot.start_time && a.is_active())
            .collect()
    }

    pub async fn insert(&self, appointment: Appointment) {
        let mut tables = self.tables.write().await;
        tables
            .by_day
            .entry(appointment.day_key())
            .or_default()
            .push(appointment.id);
        tables.appointments.insert(appointment.id, appointment);
    }

    /// Commit a transitioned copy. The day and slot of an appointment never change.
    pub async fn replace(&self, appointment: Appointment) -> Result<(), AppointmentError> {
        let mut tables = self.tables.write().await;
        match tables.appointments.get_mut(&appointment.id) {
            Some(existing) => {
                *existing = appointment;
                Ok(())
            }
            None => Err(AppointmentError::NotFound(appointment.id)),
        }
    }

    /// Increment-and-read the token counter for `day`. Tokens start at 1.
    pub async fn next_token(&self, day: DayKey) -> u64 {
        let mut tokens = self.tokens.lock().await;
        let counter = tokens.entry(day).or_insert(0);
        *counter += 1;
        debug!("Issued token {} for {}", *counter, day);
        *counter
    }

    /// Last token issued for `day`, if any.
    pub async fn last_token(&self, day: DayKey) -> Option<u64> {
        self.tokens.lock().await.get(&day).copied()
    }

    /// Queued appointments of `day` in token order.
    pub async fn waiting_line(&self, day: DayKey) -> Vec<Appointment> {
        let mut waiting: Vec<Appointment> = self
            .for_day(day)
            .await
            .into_iter()
            .filter(|a| a.status == AppointmentStatus::Queued)
            .collect();
        waiting.sort_by_key(|a| a.queue_token);
        waiting
    }

    /// Token of the most recently called patient still being served.
    pub async fn now_serving(&self, day: DayKey) -> Option<u64> {
        self.for_day(day)
            .await
            .into_iter()
            .filter(|a| matches!(a.status, AppointmentStatus::Called | AppointmentStatus::InProgress))
            .filter_map(|a| a.queue_token)
            .max()
    }

    pub async fn queue_updated_event(&self, day: DayKey) -> DomainEvent {
        let waiting = self
            .waiting_line(day)
            .await
            .into_iter()
            .filter_map(|a| {
                a.queue_token.map(|queue_token| WaitingEntry {
                    queue_token,
                    appointment_id: a.id,
                    patient_id: a.patient_id,
                })
            })
            .collect();

        DomainEvent::QueueUpdated {
            doctor_id: day.doctor_id,
            date: day.date,
            waiting,
            now_serving: self.now_serving(day).await,
        }
    }
}
