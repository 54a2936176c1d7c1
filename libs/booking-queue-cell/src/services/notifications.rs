use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, Utc};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use appointment_cell::DayKey;
use shared_models::events::{DomainEvent, EventPublisher, PublishError};

pub type NotificationSender = broadcast::Sender<String>;
pub type NotificationReceiver = broadcast::Receiver<String>;

const DAY_CHANNEL_CAPACITY: usize = 100;
const GLOBAL_CHANNEL_CAPACITY: usize = 1000;

/// In-process fan-out of domain events as JSON, one channel per doctor-day
/// plus a global feed. An external push component subscribes and forwards.
#[derive(Clone)]
pub struct BroadcastNotifier {
    channels: Arc<RwLock<HashMap<DayKey, NotificationSender>>>,
    global_sender: NotificationSender,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (global_sender, _) = broadcast::channel(GLOBAL_CHANNEL_CAPACITY);

        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            global_sender,
        }
    }

    /// Subscribe to one doctor-day. Channels are created on first subscription.
    pub fn subscribe_day(&self, doctor_id: Uuid, date: NaiveDate) -> NotificationReceiver {
        let key = DayKey::new(doctor_id, date);
        let mut channels = self.channels.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let receiver = channels
            .entry(key)
            .or_insert_with(|| broadcast::channel(DAY_CHANNEL_CAPACITY).0)
            .subscribe();

        debug!("Created notification subscription for {}", key);
        receiver
    }

    /// Drop a doctor-day channel once its last subscriber has gone.
    pub fn release_day(&self, doctor_id: Uuid, date: NaiveDate) {
        let key = DayKey::new(doctor_id, date);
        let mut channels = self.channels.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if channels.get(&key).is_some_and(|sender| sender.receiver_count() == 0) {
            channels.remove(&key);
            debug!("Removed notification channel for {}", key);
        }
    }

    pub fn subscribe_global(&self) -> NotificationReceiver {
        self.global_sender.subscribe()
    }

    pub fn active_days(&self) -> Vec<DayKey> {
        let channels = self.channels.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        channels.keys().copied().collect()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for BroadcastNotifier {
    fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        let name = event.name();
        let (doctor_id, date) = event.doctor_day();
        let key = DayKey::new(doctor_id, date);
        let message = serde_json::to_string(&event).map_err(|e| PublishError::Dispatch(e.to_string()))?;

        {
            let channels = self.channels.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(sender) = channels.get(&key) {
                // No live receivers is not a failure; the day channel just idles.
                if let Err(e) = sender.send(message.clone()) {
                    debug!("No subscribers on {}: {}", key, e);
                }
            }
        }

        let global_message = serde_json::json!({
            "doctor_id": doctor_id,
            "date": date,
            "timestamp": Utc::now().to_rfc3339(),
            "event": event
        })
        .to_string();

        if let Err(e) = self.global_sender.send(global_message) {
            debug!("Global notification feed has no subscribers: {}", e);
        }

        debug!("Broadcast {} for {}", name, key);
        Ok(())
    }
}
