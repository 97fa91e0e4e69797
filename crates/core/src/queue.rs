//! Durable job queue with lease-based claims
//!
//! A job points at the delivery it will drive and the time it becomes due.
//! Workers claim due jobs under a bounded lease; a claim that is neither
//! removed nor released before the lease expires is returned to the queue
//! with its fail count bumped, so a crashed worker cannot strand a job.
//!
//! `JobQueue` is the pure value; `DurableQueue` is the shared handle that
//! loads it from the store, applies a mutation under an async lock, and
//! writes it back. All workers in a process share one handle, which is
//! what makes claims exclusive.

use crate::delivery::DeliveryId;
use crate::storage::{JsonStore, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Identifier for a queued job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of deferred work: run one delivery attempt at `next_run_at`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub delivery_id: DeliveryId,
    pub next_run_at: DateTime<Utc>,
    pub fail_count: u32,
}

impl Job {
    pub fn new(id: JobId, delivery_id: DeliveryId, next_run_at: DateTime<Utc>) -> Self {
        Self {
            id,
            delivery_id,
            next_run_at,
            fail_count: 0,
        }
    }

    pub fn with_fail_count(self, fail_count: u32) -> Self {
        Self { fail_count, ..self }
    }
}

/// A claimed job with its lease deadline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedJob {
    pub job: Job,
    pub lease_until: DateTime<Utc>,
}

/// Outcome of a cancel attempt against the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was unclaimed and has been removed
    Removed,
    /// A worker holds the job; too late to cancel
    Claimed,
    /// No job for that delivery exists
    NotFound,
}

fn default_lease() -> Duration {
    Duration::from_secs(300)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// A time-ordered queue of jobs with lease-tracked claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobQueue {
    pub name: String,
    pub jobs: Vec<Job>,
    pub claimed: Vec<ClaimedJob>,
    #[serde(with = "duration_secs", default = "default_lease")]
    pub lease: Duration,
}

impl JobQueue {
    /// Create a new empty queue
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_lease(name, default_lease())
    }

    /// Create a new queue with a custom claim lease
    pub fn with_lease(name: impl Into<String>, lease: Duration) -> Self {
        Self {
            name: name.into(),
            jobs: Vec::new(),
            claimed: Vec::new(),
            lease,
        }
    }

    /// Insert a job, keeping the queue ordered by due time
    pub fn insert(&mut self, job: Job) {
        self.jobs.push(job);
        self.sort_jobs();
    }

    /// Claim up to `max` due jobs. Expired leases are reclaimed first, so a
    /// job abandoned by a crashed worker becomes claimable again here.
    pub fn claim_due(&mut self, now: DateTime<Utc>, max: usize) -> Vec<Job> {
        self.reclaim_expired(now);

        let mut out = Vec::new();
        while out.len() < max {
            match self.jobs.first() {
                Some(job) if job.next_run_at <= now => {
                    let job = self.jobs.remove(0);
                    self.claimed.push(ClaimedJob {
                        job: job.clone(),
                        lease_until: now + self.lease,
                    });
                    out.push(job);
                }
                _ => break,
            }
        }
        if !out.is_empty() {
            debug!(queue = %self.name, claimed = out.len(), "claimed due jobs");
        }
        out
    }

    /// Return expired claims to the queue with an incremented fail count
    fn reclaim_expired(&mut self, now: DateTime<Utc>) {
        let (expired, active): (Vec<_>, Vec<_>) = self
            .claimed
            .iter()
            .cloned()
            .partition(|c| now >= c.lease_until);
        if expired.is_empty() {
            return;
        }

        self.claimed = active;
        debug!(
            queue = %self.name,
            reclaimed = expired.len(),
            "returning expired claims to the queue"
        );
        for claim in expired {
            let mut job = claim.job;
            job.fail_count += 1;
            self.jobs.push(job);
        }
        self.sort_jobs();
    }

    /// Remove a job wherever it is, claimed or not. Idempotent; returns
    /// whether anything was removed.
    pub fn remove(&mut self, id: &JobId) -> bool {
        let before = self.jobs.len() + self.claimed.len();
        self.jobs.retain(|j| j.id != *id);
        self.claimed.retain(|c| c.job.id != *id);
        self.jobs.len() + self.claimed.len() < before
    }

    /// Swap a job for its replacement in one mutation. The retry path
    /// uses this so the old job and its successor never exist half-way.
    pub fn replace(&mut self, old: &JobId, job: Job) {
        self.remove(old);
        self.insert(job);
    }

    /// Remove every job for a delivery, claimed or not
    pub fn remove_by_delivery(&mut self, delivery_id: &DeliveryId) -> usize {
        let before = self.jobs.len() + self.claimed.len();
        self.jobs.retain(|j| j.delivery_id != *delivery_id);
        self.claimed.retain(|c| c.job.delivery_id != *delivery_id);
        before - (self.jobs.len() + self.claimed.len())
    }

    /// Remove a delivery's job only if no worker holds it. This is the
    /// cancel path: a claimed job means a send may already be in flight.
    pub fn cancel_delivery(&mut self, delivery_id: &DeliveryId) -> CancelOutcome {
        if self.claimed.iter().any(|c| c.job.delivery_id == *delivery_id) {
            return CancelOutcome::Claimed;
        }
        let before = self.jobs.len();
        self.jobs.retain(|j| j.delivery_id != *delivery_id);
        if self.jobs.len() < before {
            CancelOutcome::Removed
        } else {
            CancelOutcome::NotFound
        }
    }

    /// Put a claimed job back without touching its fail count
    pub fn release(&mut self, id: &JobId) {
        let (released, remaining): (Vec<_>, Vec<_>) = self
            .claimed
            .iter()
            .cloned()
            .partition(|c| c.job.id == *id);
        if released.is_empty() {
            return;
        }

        self.claimed = remaining;
        for claim in released {
            self.jobs.push(claim.job);
        }
        self.sort_jobs();
    }

    pub fn available_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }

    /// Total jobs, claimed or not
    pub fn depth(&self) -> usize {
        self.jobs.len() + self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.claimed.is_empty()
    }

    /// Sort by due time, then by id for a stable order
    fn sort_jobs(&mut self) {
        self.jobs
            .sort_by(|a, b| a.next_run_at.cmp(&b.next_run_at).then(a.id.0.cmp(&b.id.0)));
    }
}

/// Store-backed queue handle shared by the scheduler and all workers.
/// Every mutation loads the queue, applies the change, and saves it back
/// under one async lock, so two workers can never claim the same job.
#[derive(Clone)]
pub struct DurableQueue {
    store: JsonStore,
    name: String,
    lease: Duration,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl DurableQueue {
    pub fn open(store: JsonStore, name: impl Into<String>) -> Self {
        Self::with_lease(store, name, default_lease())
    }

    pub fn with_lease(store: JsonStore, name: impl Into<String>, lease: Duration) -> Self {
        Self {
            store,
            name: name.into(),
            lease,
            lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    async fn with_queue<T>(
        &self,
        f: impl FnOnce(&mut JobQueue) -> T,
    ) -> Result<T, StorageError> {
        let _guard = self.lock.lock().await;
        let mut queue = match self.store.load_queue(&self.name) {
            Ok(queue) => queue,
            Err(StorageError::NotFound { .. }) => JobQueue::with_lease(&self.name, self.lease),
            Err(e) => return Err(e),
        };
        // Configured lease wins over whatever was persisted
        queue.lease = self.lease;
        let out = f(&mut queue);
        self.store.save_queue(&self.name, &queue)?;
        Ok(out)
    }

    pub async fn insert(&self, job: Job) -> Result<(), StorageError> {
        self.with_queue(|q| q.insert(job)).await
    }

    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        max: usize,
    ) -> Result<Vec<Job>, StorageError> {
        self.with_queue(|q| q.claim_due(now, max)).await
    }

    pub async fn remove(&self, id: &JobId) -> Result<bool, StorageError> {
        self.with_queue(|q| q.remove(id)).await
    }

    pub async fn replace(&self, old: &JobId, job: Job) -> Result<(), StorageError> {
        self.with_queue(|q| q.replace(old, job)).await
    }

    pub async fn remove_by_delivery(
        &self,
        delivery_id: &DeliveryId,
    ) -> Result<usize, StorageError> {
        self.with_queue(|q| q.remove_by_delivery(delivery_id)).await
    }

    pub async fn cancel_delivery(
        &self,
        delivery_id: &DeliveryId,
    ) -> Result<CancelOutcome, StorageError> {
        self.with_queue(|q| q.cancel_delivery(delivery_id)).await
    }

    pub async fn release(&self, id: &JobId) -> Result<(), StorageError> {
        self.with_queue(|q| q.release(id)).await
    }

    pub async fn depth(&self) -> Result<usize, StorageError> {
        self.with_queue(|q| q.depth()).await
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
