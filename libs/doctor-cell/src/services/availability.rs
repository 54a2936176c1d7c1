use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::AvailabilityError;
use crate::models::{DoctorSchedule, Slot};

/// Reject schedules the slot walk cannot work with.
pub fn validate_schedule(schedule: &DoctorSchedule) -> Result<(), AvailabilityError> {
    if schedule.end_time <= schedule.start_time {
        return Err(AvailabilityError::InvalidSchedule(format!(
            "working hours end ({}) must be after start ({})",
            schedule.end_time, schedule.start_time
        )));
    }

    if schedule.slot_duration_minutes <= 0 {
        return Err(AvailabilityError::InvalidSchedule(format!(
            "slot duration must be positive, got {} minutes",
            schedule.slot_duration_minutes
        )));
    }

    let window_minutes = (schedule.end_time - schedule.start_time).num_minutes();
    if schedule.slot_duration_minutes > window_minutes {
        return Err(AvailabilityError::InvalidSchedule(format!(
            "slot duration of {} minutes does not fit the {} minute working window",
            schedule.slot_duration_minutes, window_minutes
        )));
    }

    if schedule.max_appointments_per_slot < 1 {
        return Err(AvailabilityError::InvalidSchedule(
            "max appointments per slot must be at least 1".to_string(),
        ));
    }

    if let Some(bad) = schedule.breaks.iter().find(|b| b.end_time <= b.start_time) {
        return Err(AvailabilityError::InvalidSchedule(format!(
            "break window {}-{} ends before it starts",
            bad.start_time, bad.end_time
        )));
    }

    Ok(())
}

/// Expand a weekly schedule into the ordered slots for `date`.
///
/// Non-working days yield an empty list rather than an error. Slots that
/// overlap a break at all are dropped. On `now`'s date every slot whose start
/// is at or before `now` is flagged `is_past`; on earlier dates every slot is.
/// No I/O: the same inputs always give the same output.
pub fn generate_slots(
    schedule: &DoctorSchedule,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Result<Vec<Slot>, AvailabilityError> {
    validate_schedule(schedule)?;

    if !schedule.works_on(date) {
        debug!("Doctor {} does not work on {}", schedule.doctor_id, date);
        return Ok(Vec::new());
    }

    let step = Duration::try_minutes(schedule.slot_duration_minutes).ok_or_else(|| {
        AvailabilityError::InvalidSchedule(format!(
            "slot duration of {} minutes is out of range",
            schedule.slot_duration_minutes
        ))
    })?;
    let mut slots = Vec::new();
    let mut start = schedule.start_time;

    loop {
        let (end, wrapped) = start.overflowing_add_signed(step);
        if wrapped != 0 || end > schedule.end_time {
            break;
        }

        if !schedule.breaks.iter().any(|b| b.overlaps(start, end)) {
            slots.push(Slot {
                date,
                start_time: start,
                end_time: end,
                is_past: is_past(date, start, now),
                booked_count: 0,
                capacity: schedule.max_appointments_per_slot,
            });
        }

        start = end;
    }

    Ok(slots)
}

/// Look up the generated slot starting at `start`, refusing past ones.
pub fn find_bookable_slot(
    schedule: &DoctorSchedule,
    date: NaiveDate,
    start: NaiveTime,
    now: NaiveDateTime,
) -> Result<Slot, AvailabilityError> {
    let slot = generate_slots(schedule, date, now)?
        .into_iter()
        .find(|slot| slot.start_time == start)
        .ok_or(AvailabilityError::SlotUnavailable { date, start })?;

    if slot.is_past {
        return Err(AvailabilityError::SlotInPast { date, start });
    }

    Ok(slot)
}

fn is_past(date: NaiveDate, start: NaiveTime, now: NaiveDateTime) -> bool {
    match date.cmp(&now.date()) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Equal => start <= now.time(),
        std::cmp::Ordering::Greater => false,
    }
}
