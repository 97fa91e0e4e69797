//! Claim and lease specs
//!
//! Two workers share one durable queue without ever sending the same
//! message twice, and a crashed worker's claim becomes available again
//! once its lease expires.

use crate::prelude::*;

#[tokio::test]
async fn concurrent_workers_send_exactly_once() {
    let f = Fixture::new();
    f.schedule_in(10).await;
    f.clock.advance(Duration::from_secs(10));

    let w1 = f.worker.clone();
    let w2 = f.worker.clone();
    let (a, b) = tokio::join!(w1.run_once(), w2.run_once());

    assert_eq!(a.unwrap() + b.unwrap(), 1);
    assert_eq!(f.transport.send_count(), 1);
}

#[tokio::test]
async fn expired_lease_is_reclaimed_and_delivered() {
    let f = Fixture::new();
    let id = f.schedule_in(10).await;

    // Simulate a worker that claimed the job and then crashed
    f.clock.advance(Duration::from_secs(10));
    let claimed = f.queue.claim_due(f.clock.now(), 1).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(f.worker.run_once().await.unwrap(), 0);

    // Past the 300 second lease the job is claimable again
    f.clock.advance(Duration::from_secs(301));
    assert_eq!(f.worker.run_once().await.unwrap(), 1);

    assert_eq!(
        f.store.load_delivery(&id.0).unwrap().status,
        DeliveryStatus::Sent
    );
    assert_eq!(f.transport.send_count(), 1);
}

#[tokio::test]
async fn claims_survive_a_restart() {
    let f = Fixture::new();
    f.schedule_in(10).await;

    f.clock.advance(Duration::from_secs(10));
    let claimed = f.queue.claim_due(f.clock.now(), 1).await.unwrap();
    assert_eq!(claimed.len(), 1);

    // A fresh handle over the same store sees the claim and honors it
    let reopened = DurableQueue::open(f.store.clone(), "deliveries");
    assert_eq!(reopened.depth().await.unwrap(), 1);
    assert!(reopened.claim_due(f.clock.now(), 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_claims_respect_concurrency() {
    let f = Fixture::new();
    for _ in 0..3 {
        f.schedule_in(10).await;
    }
    f.clock.advance(Duration::from_secs(10));

    // Default concurrency claims two jobs per pass
    assert_eq!(f.worker.run_once().await.unwrap(), 2);
    assert_eq!(f.worker.run_once().await.unwrap(), 1);
    assert_eq!(f.transport.send_count(), 3);
    assert_eq!(f.queue.depth().await.unwrap(), 0);
}
