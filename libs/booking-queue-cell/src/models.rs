use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::events::WaitingEntry;

/// Where a queued appointment stands, derived from token order only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePosition {
    pub appointment_id: Uuid,
    pub queue_token: u64,
    /// 1-based.
    pub position: u32,
    pub patients_ahead: u32,
    pub estimated_wait_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub waiting: Vec<WaitingEntry>,
    pub now_serving: Option<u64>,
    pub last_token_issued: Option<u64>,
    pub finished_count: u32,
    pub average_consultation_minutes: u32,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    pub average_consultation_minutes: u32,
    /// Fold `called -> in_progress` into the call itself.
    pub auto_start_on_call: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            average_consultation_minutes: 15,
            auto_start_on_call: false,
        }
    }
}

impl From<&AppConfig> for QueueSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            average_consultation_minutes: config.average_consultation_minutes,
            auto_start_on_call: config.auto_start_on_call,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub entered: u64,
    pub called: u64,
    pub empty_calls: u64,
    pub completed: u64,
}
