use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A doctor's recurring weekly availability. Owned by the doctor profile
/// store; read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub doctor_id: Uuid,
    pub working_days: Vec<Weekday>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i64,
    #[serde(default)]
    pub breaks: Vec<BreakWindow>,
    pub max_appointments_per_slot: u32,
    /// Day-off overrides (vacation, sick leave) on otherwise working days.
    #[serde(default)]
    pub unavailable_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DoctorSchedule {
    pub fn works_on(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.working_days.contains(&date.weekday()) && !self.unavailable_dates.contains(&date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl BreakWindow {
    /// Half-open overlap: a slot that merely touches the break edge is kept.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start < self.end_time && end > self.start_time
    }
}

/// A bookable window, computed on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_past: bool,
    pub booked_count: u32,
    pub capacity: u32,
}

impl Slot {
    pub fn is_bookable(&self) -> bool {
        !self.is_past && self.booked_count < self.capacity
    }

    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.booked_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertScheduleRequest {
    pub working_days: Vec<Weekday>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i64,
    #[serde(default)]
    pub breaks: Vec<BreakWindow>,
    pub max_appointments_per_slot: Option<u32>,
    #[serde(default)]
    pub unavailable_dates: Vec<NaiveDate>,
}

impl UpsertScheduleRequest {
    pub fn into_schedule(self, doctor_id: Uuid) -> DoctorSchedule {
        DoctorSchedule {
            doctor_id,
            working_days: self.working_days,
            start_time: self.start_time,
            end_time: self.end_time,
            slot_duration_minutes: self.slot_duration_minutes,
            breaks: self.breaks,
            max_appointments_per_slot: self.max_appointments_per_slot.unwrap_or(1),
            unavailable_dates: self.unavailable_dates,
            updated_at: Some(Utc::now()),
        }
    }
}
