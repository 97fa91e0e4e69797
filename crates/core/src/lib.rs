//! courier-core: Core library for the courier delivery engine
//!
//! This crate provides:
//! - The persisted data model (messages, deliveries, users, jobs)
//! - A durable job queue with lease-based claims
//! - The retry policy for failed delivery attempts
//! - Adapter traits for external integrations (chat transport, credentials)
//! - JSON-based storage

pub mod clock;
pub mod id;

pub mod adapters;
pub mod storage;

// Records and state machines (order matters for dependencies)
pub mod message;
pub mod user;
pub mod delivery;
pub mod policy;
pub mod queue;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use delivery::{Attempt, AttemptOutcome, Delivery, DeliveryId, DeliveryKind, DeliveryStatus};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use message::{Message, MessageId};
pub use policy::{classify, Disposition, ErrorClass, RetryPolicy};
pub use queue::{CancelOutcome, DurableQueue, Job, JobId, JobQueue};
pub use user::User;

// Re-export adapters
pub use adapters::{
    ChatTransport, Credential, CredentialError, CredentialResolver, FakeCredentialResolver,
    FakeTransport, TransportError, TransportReceipt,
};

// Re-export storage
pub use storage::{JsonStore, StorageError};
