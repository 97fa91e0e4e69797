//! Cancellation specs
//!
//! Only the owner can cancel, and only while the delivery is queued and
//! no worker has claimed its job.

use crate::prelude::*;

#[tokio::test]
async fn cancel_removes_delivery_message_and_job() {
    let f = Fixture::new();
    let id = f.schedule_in(60).await;
    let message_id = f.store.load_delivery(&id.0).unwrap().message_id;

    f.scheduler.cancel(&id, OWNER).await.unwrap();

    assert!(f.store.load_delivery(&id.0).is_err());
    assert!(f.store.load_message(&message_id.0).is_err());
    assert_eq!(f.queue.depth().await.unwrap(), 0);

    // Nothing left for the worker to do
    f.clock.advance(Duration::from_secs(60));
    assert_eq!(f.worker.run_once().await.unwrap(), 0);
    assert_eq!(f.transport.send_count(), 0);
}

#[tokio::test]
async fn cancel_by_non_owner_is_refused() {
    let f = Fixture::new();
    let id = f.schedule_in(60).await;

    let result = f.scheduler.cancel(&id, "U999").await;
    assert!(matches!(result, Err(CancelError::NotCancellable)));

    // The delivery still fires on schedule
    f.clock.advance(Duration::from_secs(60));
    assert_eq!(f.worker.run_once().await.unwrap(), 1);
    assert_eq!(
        f.store.load_delivery(&id.0).unwrap().status,
        DeliveryStatus::Sent
    );
}

#[tokio::test]
async fn cancel_of_a_claimed_job_is_refused() {
    let f = Fixture::new();
    let id = f.schedule_in(10).await;

    // A worker holds the job: the send may already be in flight
    f.clock.advance(Duration::from_secs(10));
    let claimed = f.queue.claim_due(f.clock.now(), 1).await.unwrap();
    assert_eq!(claimed.len(), 1);

    let result = f.scheduler.cancel(&id, OWNER).await;
    assert!(matches!(result, Err(CancelError::NotCancellable)));
    assert!(f.store.load_delivery(&id.0).is_ok());
}

#[tokio::test]
async fn cancel_after_send_is_refused() {
    let f = Fixture::new();
    let id = f.schedule_in(10).await;

    f.clock.advance(Duration::from_secs(10));
    assert_eq!(f.worker.run_once().await.unwrap(), 1);

    let result = f.scheduler.cancel(&id, OWNER).await;
    assert!(matches!(result, Err(CancelError::NotCancellable)));
    assert_eq!(
        f.store.load_delivery(&id.0).unwrap().status,
        DeliveryStatus::Sent
    );
}

#[tokio::test]
async fn cancel_racing_a_completing_worker_never_loses_a_sent_message() {
    // The interleaving varies run to run; every outcome must be
    // consistent: either the cancel won and nothing was sent, or the
    // worker won and the sent record survives
    for _ in 0..10 {
        let f = Fixture::new();
        let id = f.schedule_in(10).await;
        f.clock.advance(Duration::from_secs(10));

        let (cancelled, processed) =
            tokio::join!(f.scheduler.cancel(&id, OWNER), f.worker.run_once());
        processed.unwrap();

        if cancelled.is_ok() {
            assert_eq!(f.transport.send_count(), 0);
            assert!(f.store.load_delivery(&id.0).is_err());
        } else if f.transport.send_count() == 1 {
            assert_eq!(
                f.store.load_delivery(&id.0).unwrap().status,
                DeliveryStatus::Sent
            );
        }
    }
}

#[tokio::test]
async fn cancel_of_an_unknown_delivery_is_refused() {
    let f = Fixture::new();
    let result = f
        .scheduler
        .cancel(&DeliveryId("no-such-delivery".to_string()), OWNER)
        .await;
    assert!(matches!(result, Err(CancelError::NotCancellable)));
}
