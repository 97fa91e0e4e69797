//! User credential records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user known to the engine, with whatever workspace tokens we hold
/// for them. All fields except the id are optional: a user record may
/// exist before any token was granted, or after a failed refresh wiped
/// the tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
        }
    }

    /// Drop all stored tokens, forcing a fresh grant before the user can
    /// send again
    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.token_expires_at = None;
    }
}
