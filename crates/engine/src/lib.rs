//! courier-engine: scheduling, cancellation, and the delivery worker
//!
//! This crate provides:
//! - `Scheduler`: the write-side API (immediate send, future delivery, cancel)
//! - `Worker`: the claim loop that drives queued deliveries to a terminal state
//! - Read projections over the store for scheduled and sent listings

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod scheduler;
pub mod views;
pub mod worker;

pub use error::{CancelError, ScheduleError, WorkerError};
pub use scheduler::Scheduler;
pub use views::{list_scheduled, list_sent, ScheduledMessage, SentMessage};
pub use worker::Worker;
