//! Scheduling and cancellation
//!
//! The write-side API. An immediate send resolves the credential and calls
//! the transport synchronously; a future delivery persists the records and
//! inserts a job for the worker. Either way exactly one message and one
//! delivery record exist afterwards (terminal for immediate sends, queued
//! for scheduled ones), except for rejected requests which persist nothing.

use chrono::{DateTime, Utc};
use courier_core::adapters::{
    ChatTransport, CredentialError, CredentialResolver, TransportError,
};
use courier_core::clock::Clock;
use courier_core::delivery::{Delivery, DeliveryId, DeliveryStatus};
use courier_core::id::IdGen;
use courier_core::message::{Message, MessageId};
use courier_core::queue::{CancelOutcome, DurableQueue, Job, JobId};
use courier_core::storage::JsonStore;
use tracing::{info, warn};

use crate::error::{CancelError, ScheduleError};

/// The write-side entry point for deliveries
#[derive(Clone)]
pub struct Scheduler<C, I, R, T>
where
    C: Clock,
    I: IdGen,
    R: CredentialResolver,
    T: ChatTransport,
{
    store: JsonStore,
    queue: DurableQueue,
    clock: C,
    ids: I,
    resolver: R,
    transport: T,
}

impl<C, I, R, T> Scheduler<C, I, R, T>
where
    C: Clock,
    I: IdGen,
    R: CredentialResolver,
    T: ChatTransport,
{
    pub fn new(
        store: JsonStore,
        queue: DurableQueue,
        clock: C,
        ids: I,
        resolver: R,
        transport: T,
    ) -> Self {
        Self {
            store,
            queue,
            clock,
            ids,
            resolver,
            transport,
        }
    }

    /// Schedule a message for delivery. `when = None` sends immediately;
    /// a future time queues the delivery for the worker.
    pub async fn schedule(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
        when: Option<DateTime<Utc>>,
    ) -> Result<DeliveryId, ScheduleError> {
        match when {
            None => self.send_now(user_id, channel_id, text).await,
            Some(at) => self.enqueue(user_id, channel_id, text, at).await,
        }
    }

    async fn send_now(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<DeliveryId, ScheduleError> {
        let credential = match self.resolver.resolve(user_id).await {
            Ok(credential) => credential,
            Err(CredentialError::Unavailable(_)) => {
                return Err(ScheduleError::Unauthenticated(user_id.to_string()));
            }
            Err(CredentialError::Store(e)) => return Err(ScheduleError::Credential(e)),
        };

        let now = self.clock.now();
        let message = Message::new(MessageId(self.ids.next()), user_id, text, now);
        let mut delivery = Delivery::immediate(
            DeliveryId(self.ids.next()),
            message.id.clone(),
            user_id,
            channel_id,
            now,
        );

        match self.transport.send(channel_id, text, &credential).await {
            Ok(receipt) => {
                delivery.record_success(self.clock.now(), Some(receipt.raw));
                self.store.save_message(&message)?;
                self.store.save_delivery(&delivery)?;
                info!(delivery = %delivery.id, channel = %channel_id, "message sent");
                Ok(delivery.id)
            }
            Err(err) => {
                let (error, raw) = match &err {
                    TransportError::Api { code, raw } => (code.clone(), raw.clone()),
                    TransportError::Network(msg) => (msg.clone(), None),
                };
                delivery.record_failure(self.clock.now(), error, raw);
                delivery.mark_failed();
                self.store.save_message(&message)?;
                self.store.save_delivery(&delivery)?;
                let code = err.code().unwrap_or("network_error").to_string();
                warn!(delivery = %delivery.id, %code, "immediate send failed");
                Err(ScheduleError::Transport { code })
            }
        }
    }

    async fn enqueue(
        &self,
        user_id: &str,
        channel_id: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<DeliveryId, ScheduleError> {
        let now = self.clock.now();
        if at <= now {
            return Err(ScheduleError::InvalidSchedule);
        }

        let message = Message::new(MessageId(self.ids.next()), user_id, text, now);
        let delivery = Delivery::scheduled(
            DeliveryId(self.ids.next()),
            message.id.clone(),
            user_id,
            channel_id,
            at,
            now,
        );

        self.store.save_message(&message)?;
        self.store.save_delivery(&delivery)?;
        self.queue
            .insert(Job::new(
                JobId(self.ids.next()),
                delivery.id.clone(),
                at,
            ))
            .await?;

        info!(delivery = %delivery.id, scheduled = %at, "delivery queued");
        Ok(delivery.id)
    }

    /// Cancel a queued delivery. Only the owner can cancel, and only while
    /// the delivery is queued and no worker has claimed its job. Cancelling
    /// deletes both the delivery and its message.
    pub async fn cancel(
        &self,
        delivery_id: &DeliveryId,
        requester: &str,
    ) -> Result<(), CancelError> {
        let delivery = match self.store.load_delivery(&delivery_id.0) {
            Ok(delivery) => delivery,
            Err(e) if e.is_not_found() => return Err(CancelError::NotCancellable),
            Err(e) => return Err(e.into()),
        };

        if delivery.user_id != requester || delivery.status != DeliveryStatus::Queued {
            return Err(CancelError::NotCancellable);
        }

        match self.queue.cancel_delivery(delivery_id).await? {
            CancelOutcome::Claimed => return Err(CancelError::NotCancellable),
            CancelOutcome::Removed => {}
            // NotFound cuts two ways: a worker crashed between writes and
            // left a stale queued delivery (safe to delete), or a worker
            // finished the whole job after the load above. Re-check the
            // record before deleting anything.
            CancelOutcome::NotFound => match self.store.load_delivery(&delivery_id.0) {
                Ok(current) if current.status == DeliveryStatus::Queued => {}
                Ok(_) => return Err(CancelError::NotCancellable),
                Err(e) if e.is_not_found() => return Err(CancelError::NotCancellable),
                Err(e) => return Err(e.into()),
            },
        }

        self.store.delete_delivery(&delivery_id.0)?;
        self.store.delete_message(&delivery.message_id.0)?;
        info!(delivery = %delivery_id, "delivery cancelled");
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
