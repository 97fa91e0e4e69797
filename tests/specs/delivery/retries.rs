//! Retry and abandonment specs
//!
//! A retryable failure earns a fresh job sixty seconds out; three
//! failures, or one permanent error, abandon the delivery entirely.

use crate::prelude::*;

#[tokio::test]
async fn retryable_failure_is_retried_after_backoff() {
    let f = Fixture::new();
    f.transport.push_api_error("rate_limited");
    let id = f.schedule_in(10).await;

    f.clock.advance(Duration::from_secs(10));
    assert_eq!(f.worker.run_once().await.unwrap(), 1);

    // Still queued, one failed attempt on the record
    let delivery = f.store.load_delivery(&id.0).unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Queued);
    assert_eq!(delivery.attempt_count(), 1);

    // The retry is not due before the backoff elapses
    assert_eq!(f.worker.run_once().await.unwrap(), 0);

    f.clock.advance(Duration::from_secs(60));
    assert_eq!(f.worker.run_once().await.unwrap(), 1);

    let delivery = f.store.load_delivery(&id.0).unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Sent);
    assert_eq!(delivery.attempt_count(), 2);
    assert_eq!(f.transport.send_count(), 2);
}

#[tokio::test]
async fn delivery_is_abandoned_after_three_failures() {
    let f = Fixture::new();
    for _ in 0..3 {
        f.transport.push_api_error("internal_error");
    }
    let id = f.schedule_in(10).await;
    let message_id = f.store.load_delivery(&id.0).unwrap().message_id;

    f.clock.advance(Duration::from_secs(10));
    for _ in 0..3 {
        assert_eq!(f.worker.run_once().await.unwrap(), 1);
        f.clock.advance(Duration::from_secs(60));
    }

    // Abandoned: both records deleted, queue drained
    assert!(f.store.load_delivery(&id.0).is_err());
    assert!(f.store.load_message(&message_id.0).is_err());
    assert_eq!(f.queue.depth().await.unwrap(), 0);
    assert_eq!(f.transport.send_count(), 3);
}

#[tokio::test]
async fn permanent_error_abandons_on_first_attempt() {
    let f = Fixture::new();
    f.transport.push_api_error("channel_not_found");
    let id = f.schedule_in(10).await;

    f.clock.advance(Duration::from_secs(10));
    assert_eq!(f.worker.run_once().await.unwrap(), 1);

    assert!(f.store.load_delivery(&id.0).is_err());
    assert_eq!(f.queue.depth().await.unwrap(), 0);
    assert_eq!(f.transport.send_count(), 1);
}

#[tokio::test]
async fn network_failure_counts_as_retryable() {
    let f = Fixture::new();
    f.transport.push_network_error("connection reset");
    let id = f.schedule_in(10).await;

    f.clock.advance(Duration::from_secs(10));
    assert_eq!(f.worker.run_once().await.unwrap(), 1);

    let delivery = f.store.load_delivery(&id.0).unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Queued);
    assert_eq!(f.queue.depth().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_credential_fails_without_a_send() {
    let f = Fixture::new();
    let id = f.schedule_in(10).await;
    f.resolver.revoke(OWNER);

    f.clock.advance(Duration::from_secs(10));
    assert_eq!(f.worker.run_once().await.unwrap(), 1);

    // The failed record stays visible so the user can see why nothing
    // was sent; no attempt ever reached the transport
    let delivery = f.store.load_delivery(&id.0).unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Failed);
    assert_eq!(
        delivery.last_attempt().unwrap().error.as_deref(),
        Some("credential_unavailable")
    );
    assert_eq!(f.transport.send_count(), 0);
    assert_eq!(f.queue.depth().await.unwrap(), 0);
}
