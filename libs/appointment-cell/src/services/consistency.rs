// libs/appointment-cell/src/services/consistency.rs
//
// Per-key scheduling locks. Every write that can change a slot's booked count
// or a doctor-day's queue runs under one of these, re-reads state after
// acquiring it, and commits in a single store write.
//
// Lock order is fixed: day lock first, then slot lock. Book takes only the
// slot lock; EnterQueue/CallNext/BeginConsultation take only the day lock;
// Approve/Reject/Cancel/Complete take both.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::models::{DayKey, SlotKey};

/// Above this many registered keys, idle entries are pruned on the next acquire.
const PRUNE_THRESHOLD: usize = 1024;

/// A registry of async mutexes created on first use for each key.
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`. Released on drop.
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held for the lifetime of a day-scoped write.
pub struct DayGuard {
    _day: OwnedMutexGuard<()>,
}

/// Held for the lifetime of a write that touches both a queue and a slot.
pub struct DaySlotGuard {
    _day: OwnedMutexGuard<()>,
    _slot: OwnedMutexGuard<()>,
}

#[derive(Default)]
pub struct SchedulingLocks {
    days: KeyedLocks<DayKey>,
    slots: KeyedLocks<SlotKey>,
}

impl SchedulingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_day(&self, day: DayKey) -> DayGuard {
        debug!("Acquiring day lock {}", day);
        DayGuard {
            _day: self.days.acquire(&day).await,
        }
    }

    pub async fn lock_slot(&self, slot: SlotKey) -> OwnedMutexGuard<()> {
        debug!("Acquiring slot lock {}", slot);
        self.slots.acquire(&slot).await
    }

    /// Day then slot, never the other way round.
    pub async fn lock_day_and_slot(&self, slot: SlotKey) -> DaySlotGuard {
        let day = self.days.acquire(&slot.day()).await;
        let slot_guard = self.slots.acquire(&slot).await;
        DaySlotGuard {
            _day: day,
            _slot: slot_guard,
        }
    }
}
