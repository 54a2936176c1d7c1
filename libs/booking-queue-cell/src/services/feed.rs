use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use chrono::NaiveDate;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::notifications::{BroadcastNotifier, NotificationReceiver};

/// Push one doctor-day's events to a connected client until either side
/// hangs up, then give the channel back to the notifier.
pub async fn stream_day_feed(
    socket: WebSocket,
    notifier: Arc<BroadcastNotifier>,
    doctor_id: Uuid,
    date: NaiveDate,
    feed: NotificationReceiver,
) {
    let label = format!("{}:{}", doctor_id, date);
    forward(socket, feed, &label).await;
    notifier.release_day(doctor_id, date);
}

pub async fn stream_global_feed(socket: WebSocket, feed: NotificationReceiver) {
    forward(socket, feed, "global").await;
}

async fn forward(socket: WebSocket, mut feed: NotificationReceiver, label: &str) {
    let (mut sink, mut stream) = socket.split();
    info!("Feed {} connected", label);

    loop {
        tokio::select! {
            message = feed.recv() => match message {
                Ok(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        debug!("Feed {} send failed, closing: {}", label, e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Feed {} lagged, {} events skipped", label, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Feed {} client error: {}", label, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    info!("Feed {} disconnected", label);
}
