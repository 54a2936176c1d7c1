use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AvailabilityError;
use crate::models::DoctorSchedule;
use crate::services::availability::validate_schedule;

/// Read side of the doctor profile store, as far as the engine needs it.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    async fn schedule_for(&self, doctor_id: Uuid) -> Result<Option<DoctorSchedule>, AvailabilityError>;

    async fn require_schedule(&self, doctor_id: Uuid) -> Result<DoctorSchedule, AvailabilityError> {
        self.schedule_for(doctor_id)
            .await?
            .ok_or(AvailabilityError::ScheduleNotFound(doctor_id))
    }
}

/// In-process schedule store keyed by doctor.
#[derive(Default)]
pub struct ScheduleDirectory {
    schedules: RwLock<HashMap<Uuid, DoctorSchedule>>,
}

impl ScheduleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a doctor's schedule. Invalid schedules are refused
    /// here so the calendar never sees them.
    pub async fn upsert(&self, mut schedule: DoctorSchedule) -> Result<DoctorSchedule, AvailabilityError> {
        validate_schedule(&schedule)?;

        schedule.working_days.sort_by_key(|day| day.num_days_from_monday());
        schedule.working_days.dedup();
        schedule.breaks.sort_by_key(|b| b.start_time);
        schedule.unavailable_dates.sort();
        schedule.unavailable_dates.dedup();
        if schedule.updated_at.is_none() {
            schedule.updated_at = Some(Utc::now());
        }

        let mut schedules = self.schedules.write().await;
        let replaced = schedules.insert(schedule.doctor_id, schedule.clone()).is_some();
        info!(
            "Schedule for doctor {} {}",
            schedule.doctor_id,
            if replaced { "updated" } else { "created" }
        );

        Ok(schedule)
    }

    pub async fn remove(&self, doctor_id: Uuid) -> Option<DoctorSchedule> {
        let removed = self.schedules.write().await.remove(&doctor_id);
        debug!("Removed schedule for doctor {}: {}", doctor_id, removed.is_some());
        removed
    }

    pub async fn len(&self) -> usize {
        self.schedules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.schedules.read().await.is_empty()
    }
}

#[async_trait]
impl ScheduleProvider for ScheduleDirectory {
    async fn schedule_for(&self, doctor_id: Uuid) -> Result<Option<DoctorSchedule>, AvailabilityError> {
        Ok(self.schedules.read().await.get(&doctor_id).cloned())
    }
}
