//! Retry policy for failed delivery attempts
//!
//! Transport errors fall into two classes: permanent errors that no retry
//! can fix (the channel is gone, the token was revoked) and everything
//! else, which gets a bounded number of retries at a fixed delay.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Classification of a transport error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Permanent,
}

/// Error codes that will not self-heal with a retry
const PERMANENT_CODES: &[&str] = &[
    "missing_scope",
    "channel_not_found",
    "not_in_channel",
    "invalid_auth",
    "token_expired",
    "token_revoked",
    "account_inactive",
];

/// Classify a transport error code. Unknown codes are retryable.
pub fn classify(code: &str) -> ErrorClass {
    if PERMANENT_CODES.contains(&code) {
        ErrorClass::Permanent
    } else {
        ErrorClass::Retryable
    }
}

/// What to do with a delivery after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Re-queue for another attempt at `run_at`
    Retry { run_at: DateTime<Utc> },
    /// Stop trying
    Abandon,
}

/// Bounded retries with a fixed delay between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Delay before the next attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Decide the disposition after a failed attempt. `attempts` counts
    /// every attempt made so far, including the one that just failed.
    /// Errors without a code (network failures) are treated as retryable.
    pub fn on_failure(
        &self,
        code: Option<&str>,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Disposition {
        if let Some(code) = code {
            if classify(code) == ErrorClass::Permanent {
                return Disposition::Abandon;
            }
        }
        if attempts >= self.max_attempts {
            Disposition::Abandon
        } else {
            Disposition::Retry {
                run_at: now + self.backoff,
            }
        }
    }
}
