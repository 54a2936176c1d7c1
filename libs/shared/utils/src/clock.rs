use std::sync::RwLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

/// Source of "now" for every time-dependent rule (past slots, same-day queueing).
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Offset of the clinic's wall clock.
    fn offset(&self) -> FixedOffset;

    fn local_now(&self) -> NaiveDateTime {
        self.now_utc().with_timezone(&self.offset()).naive_local()
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Offsets outside +/-24h fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::with_offset_minutes(0)
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Settable clock pinned at a clinic-local instant.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    /// `local` is read as UTC wall time.
    pub fn at(local: NaiveDateTime) -> Self {
        Self {
            now: RwLock::new(local.and_utc()),
            offset: Utc.fix(),
        }
    }

    pub fn set(&self, local: NaiveDateTime) {
        if let Ok(mut now) = self.now.write() {
            *now = local.and_utc();
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.write() {
            *now += by;
        }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn offset_shifts_the_local_date() {
        let clock = SystemClock::with_offset_minutes(14 * 60);
        assert_eq!(clock.offset().local_minus_utc(), 14 * 3600);

        let bogus = SystemClock::with_offset_minutes(48 * 60);
        assert_eq!(bogus.offset().local_minus_utc(), 0);
    }

    #[test]
    fn fixed_clock_can_be_moved() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 12)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        let clock = FixedClock::at(start);
        assert_eq!(clock.local_now(), start);

        clock.advance(Duration::hours(17));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 13).unwrap());
    }
}
