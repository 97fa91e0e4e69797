//! Delivery worker
//!
//! Claims due jobs from the queue and drives each delivery to its next
//! state: sent, retried later, or abandoned. The claimed job is removed
//! exactly once per processing pass; a retry is a fresh job, never the
//! old one re-armed.

use courier_core::adapters::{ChatTransport, CredentialError, CredentialResolver, TransportError};
use courier_core::clock::Clock;
use courier_core::delivery::DeliveryStatus;
use courier_core::id::IdGen;
use courier_core::policy::{Disposition, RetryPolicy};
use courier_core::queue::{DurableQueue, Job, JobId};
use courier_core::storage::JsonStore;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::error::WorkerError;

const DEFAULT_CONCURRENCY: usize = 2;

/// Worker that processes due delivery jobs
#[derive(Clone)]
pub struct Worker<C, I, R, T>
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
    policy: RetryPolicy,
    concurrency: usize,
}

impl<C, I, R, T> Worker<C, I, R, T>
where
    C: Clock + 'static,
    I: IdGen + 'static,
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
            policy: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_policy(self, policy: RetryPolicy) -> Self {
        Self { policy, ..self }
    }

    pub fn with_concurrency(self, concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            ..self
        }
    }

    /// Claim and process one batch of due jobs, at most `concurrency` at a
    /// time. Returns how many jobs were claimed.
    pub async fn run_once(&self) -> Result<usize, WorkerError> {
        let now = self.clock.now();
        let jobs = self.queue.claim_due(now, self.concurrency).await?;
        if jobs.is_empty() {
            return Ok(0);
        }
        let count = jobs.len();

        let mut tasks = tokio::task::JoinSet::new();
        for job in jobs {
            let worker = self.clone();
            tasks.spawn(async move {
                let job_id = job.id.clone();
                if let Err(e) = worker.process(job).await {
                    error!(job = %job_id, error = %e, "job processing failed");
                }
            });
        }
        while tasks.join_next().await.is_some() {}

        Ok(count)
    }

    async fn process(&self, job: Job) -> Result<(), WorkerError> {
        // A job whose delivery is gone, terminal, or missing its message is
        // stale; drop it without an attempt
        let mut delivery = match self.store.load_delivery(&job.delivery_id.0) {
            Ok(delivery) => delivery,
            Err(e) if e.is_not_found() => {
                debug!(job = %job.id, delivery = %job.delivery_id, "dropping job for missing delivery");
                self.queue.remove(&job.id).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if delivery.status != DeliveryStatus::Queued {
            debug!(job = %job.id, delivery = %delivery.id, status = %delivery.status, "dropping job for terminal delivery");
            self.queue.remove(&job.id).await?;
            return Ok(());
        }
        let message = match self.store.load_message(&delivery.message_id.0) {
            Ok(message) => message,
            Err(e) if e.is_not_found() => {
                debug!(job = %job.id, delivery = %delivery.id, "dropping job for missing message");
                self.queue.remove(&job.id).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // No usable credential is terminal, but the record stays so the
        // user can see why nothing was sent. A credential backend error is
        // not: the token may be fine, so the job goes back untouched.
        let credential = match self.resolver.resolve(&delivery.user_id).await {
            Ok(credential) => credential,
            Err(CredentialError::Unavailable(_)) => {
                delivery.record_failure(self.clock.now(), "credential_unavailable", None);
                delivery.mark_failed();
                self.store.save_delivery(&delivery)?;
                self.queue.remove(&job.id).await?;
                warn!(delivery = %delivery.id, "delivery failed: no usable credential");
                return Ok(());
            }
            Err(CredentialError::Store(e)) => {
                self.queue.release(&job.id).await?;
                warn!(delivery = %delivery.id, error = %e, "credential backend error, delivery deferred");
                return Ok(());
            }
        };

        let result = self
            .transport
            .send(&delivery.channel_id, &message.text, &credential)
            .await;
        let now = self.clock.now();

        match result {
            Ok(receipt) => {
                delivery.record_success(now, Some(receipt.raw));
                self.store.save_delivery(&delivery)?;
                self.queue.remove(&job.id).await?;
                info!(delivery = %delivery.id, attempt = delivery.attempt_count(), "message sent");
            }
            Err(err) => {
                let (reason, raw) = match &err {
                    TransportError::Api { code, raw } => (code.clone(), raw.clone()),
                    TransportError::Network(msg) => (msg.clone(), None),
                };
                delivery.record_failure(now, reason, raw);

                match self.policy.on_failure(err.code(), delivery.attempt_count(), now) {
                    Disposition::Retry { run_at } => {
                        self.store.save_delivery(&delivery)?;
                        let retry = Job::new(JobId(self.ids.next()), delivery.id.clone(), run_at)
                            .with_fail_count(job.fail_count + 1);
                        // One persisted mutation: a crash leaves either the
                        // claimed job or its replacement, never neither
                        self.queue.replace(&job.id, retry).await?;
                        warn!(
                            delivery = %delivery.id,
                            attempt = delivery.attempt_count(),
                            retry_at = %run_at,
                            "send failed, retrying"
                        );
                    }
                    Disposition::Abandon => {
                        delivery.mark_failed();
                        // Terminal status lands before cleanup: a crash in
                        // between leaves a failed record, never a zombie
                        // still marked queued
                        self.store.save_delivery(&delivery)?;
                        self.queue.remove(&job.id).await?;
                        self.store.delete_delivery(&delivery.id.0)?;
                        self.store.delete_message(&delivery.message_id.0)?;
                        error!(
                            delivery = %delivery.id,
                            attempts = delivery.attempt_count(),
                            "delivery abandoned"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Run the worker continuously
    pub async fn run(&self, poll_interval: Duration) -> Result<(), WorkerError> {
        loop {
            match self.run_once().await {
                Ok(0) => {
                    // Nothing due, wait before checking again
                    sleep(poll_interval).await;
                }
                Ok(_) => {
                    // Processed a batch, check for more immediately
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "worker error");
                    sleep(poll_interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
