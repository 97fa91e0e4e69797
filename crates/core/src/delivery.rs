//! Delivery records and their state machine
//!
//! A delivery tracks one message's journey to a channel: queued, then a
//! terminal sent/failed/cancelled. Attempts are append-only; status moves
//! to a terminal state exactly once.

use crate::message::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a delivery record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(pub String);

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the delivery was requested for now or for a future time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    Immediate,
    Scheduled,
}

/// Delivery lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Failed,
    Cancelled,
}

impl DeliveryStatus {
    /// Terminal statuses never transition again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryStatus::Queued)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeliveryStatus::Queued => "queued",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// One send attempt against the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub timestamp: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

/// A delivery record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub message_id: MessageId,
    pub user_id: String,
    pub channel_id: String,
    pub kind: DeliveryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    pub attempts: Vec<Attempt>,
    pub created_at: DateTime<Utc>,
}

impl Delivery {
    /// Create a queued delivery for a future time
    pub fn scheduled(
        id: DeliveryId,
        message_id: MessageId,
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        scheduled_time: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            message_id,
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            kind: DeliveryKind::Scheduled,
            scheduled_time: Some(scheduled_time),
            status: DeliveryStatus::Queued,
            attempts: Vec::new(),
            created_at,
        }
    }

    /// Create a delivery for an immediate send
    pub fn immediate(
        id: DeliveryId,
        message_id: MessageId,
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            message_id,
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            kind: DeliveryKind::Immediate,
            scheduled_time: None,
            status: DeliveryStatus::Queued,
            attempts: Vec::new(),
            created_at,
        }
    }

    /// Append a success attempt and move to `Sent`
    pub fn record_success(&mut self, at: DateTime<Utc>, response: Option<serde_json::Value>) {
        self.attempts.push(Attempt {
            timestamp: at,
            outcome: AttemptOutcome::Success,
            error: None,
            response,
        });
        self.status = DeliveryStatus::Sent;
    }

    /// Append a failure attempt. The status is left untouched; the caller
    /// decides between retry (stay `Queued`) and `mark_failed`.
    pub fn record_failure(
        &mut self,
        at: DateTime<Utc>,
        error: impl Into<String>,
        response: Option<serde_json::Value>,
    ) {
        self.attempts.push(Attempt {
            timestamp: at,
            outcome: AttemptOutcome::Failure,
            error: Some(error.into()),
            response,
        });
    }

    /// Move to the terminal `Failed` status
    pub fn mark_failed(&mut self) {
        self.status = DeliveryStatus::Failed;
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn make_delivery() -> Delivery {
        Delivery::scheduled(
            DeliveryId("d-1".into()),
            MessageId("m-1".into()),
            "U123",
            "C456",
            Utc::now() + chrono::Duration::minutes(10),
            Utc::now(),
        )
    }

    #[test]
    fn scheduled_delivery_starts_queued() {
        let delivery = make_delivery();
        assert_eq!(delivery.status, DeliveryStatus::Queued);
        assert_eq!(delivery.kind, DeliveryKind::Scheduled);
        assert!(delivery.scheduled_time.is_some());
        assert!(delivery.attempts.is_empty());
    }

    #[test]
    fn immediate_delivery_has_no_scheduled_time() {
        let delivery = Delivery::immediate(
            DeliveryId("d-1".into()),
            MessageId("m-1".into()),
            "U123",
            "C456",
            Utc::now(),
        );
        assert_eq!(delivery.kind, DeliveryKind::Immediate);
        assert!(delivery.scheduled_time.is_none());
    }

    #[test]
    fn record_success_appends_attempt_and_moves_to_sent() {
        let mut delivery = make_delivery();
        delivery.record_success(Utc::now(), Some(serde_json::json!({"ok": true})));

        assert_eq!(delivery.status, DeliveryStatus::Sent);
        assert_eq!(delivery.attempt_count(), 1);
        assert_eq!(delivery.attempts[0].outcome, AttemptOutcome::Success);
        assert!(delivery.attempts[0].error.is_none());
    }

    #[test]
    fn record_failure_appends_but_leaves_status() {
        let mut delivery = make_delivery();
        delivery.record_failure(Utc::now(), "rate_limited", None);

        assert_eq!(delivery.status, DeliveryStatus::Queued);
        assert_eq!(delivery.attempt_count(), 1);
        assert_eq!(delivery.attempts[0].error.as_deref(), Some("rate_limited"));
    }

    #[test]
    fn attempts_are_append_only() {
        let mut delivery = make_delivery();
        delivery.record_failure(Utc::now(), "rate_limited", None);
        delivery.record_failure(Utc::now(), "internal_error", None);
        delivery.record_success(Utc::now(), None);

        assert_eq!(delivery.attempt_count(), 3);
        assert_eq!(delivery.attempts[0].error.as_deref(), Some("rate_limited"));
        assert_eq!(delivery.attempts[1].error.as_deref(), Some("internal_error"));
        assert_eq!(delivery.attempts[2].outcome, AttemptOutcome::Success);
    }

    #[test]
    fn mark_failed_is_terminal() {
        let mut delivery = make_delivery();
        delivery.mark_failed();
        assert_eq!(delivery.status, DeliveryStatus::Failed);
        assert!(delivery.status.is_terminal());
    }

    #[parameterized(
        queued = { DeliveryStatus::Queued, false },
        sent = { DeliveryStatus::Sent, true },
        failed = { DeliveryStatus::Failed, true },
        cancelled = { DeliveryStatus::Cancelled, true },
    )]
    fn terminal_statuses(status: DeliveryStatus, expected: bool) {
        assert_eq!(status.is_terminal(), expected);
    }

    #[test]
    fn delivery_round_trips_through_json() {
        let mut delivery = make_delivery();
        delivery.record_failure(Utc::now(), "rate_limited", None);

        let json = serde_json::to_string(&delivery).unwrap();
        let loaded: Delivery = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.id, delivery.id);
        assert_eq!(loaded.status, DeliveryStatus::Queued);
        assert_eq!(loaded.attempt_count(), 1);
    }
}
