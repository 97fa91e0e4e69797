//! Read projections over the store
//!
//! Pure reads joining deliveries with their message text. These back the
//! daemon's listing requests, so the shapes serialize.

use chrono::{DateTime, Utc};
use courier_core::delivery::{DeliveryKind, DeliveryStatus};
use courier_core::storage::{JsonStore, StorageError};
use serde::{Deserialize, Serialize};

/// A scheduled delivery that has not been sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub delivery_id: String,
    pub channel_id: String,
    pub text: String,
    pub scheduled_time: DateTime<Utc>,
    pub status: DeliveryStatus,
}

/// A delivery that reached the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentMessage {
    pub delivery_id: String,
    pub channel_id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// A user's pending (and credential-failed) scheduled deliveries, soonest
/// first
pub fn list_scheduled(
    store: &JsonStore,
    user_id: &str,
) -> Result<Vec<ScheduledMessage>, StorageError> {
    let mut out = Vec::new();
    for id in store.list_deliveries()? {
        let delivery = match store.load_delivery(&id) {
            Ok(delivery) => delivery,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        if delivery.user_id != user_id
            || delivery.kind != DeliveryKind::Scheduled
            || delivery.status == DeliveryStatus::Sent
        {
            continue;
        }
        let Some(scheduled_time) = delivery.scheduled_time else {
            continue;
        };
        let text = match store.load_message(&delivery.message_id.0) {
            Ok(message) => message.text,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        out.push(ScheduledMessage {
            delivery_id: delivery.id.0,
            channel_id: delivery.channel_id,
            text,
            scheduled_time,
            status: delivery.status,
        });
    }
    out.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
    Ok(out)
}

/// A user's sent deliveries, most recent first
pub fn list_sent(store: &JsonStore, user_id: &str) -> Result<Vec<SentMessage>, StorageError> {
    let mut out = Vec::new();
    for id in store.list_deliveries()? {
        let delivery = match store.load_delivery(&id) {
            Ok(delivery) => delivery,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        if delivery.user_id != user_id || delivery.status != DeliveryStatus::Sent {
            continue;
        }
        let Some(sent_at) = delivery.last_attempt().map(|a| a.timestamp) else {
            continue;
        };
        let text = match store.load_message(&delivery.message_id.0) {
            Ok(message) => message.text,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        out.push(SentMessage {
            delivery_id: delivery.id.0,
            channel_id: delivery.channel_id,
            text,
            sent_at,
        });
    }
    out.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    Ok(out)
}

#[cfg(test)]
#[path = "views_tests.rs"]
mod tests;
