//! Adapter trait definitions for external integrations

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Credential Resolver
// =============================================================================

/// A usable access token for one send
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

/// Errors from credential resolution
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No usable token exists for the user and none could be obtained
    #[error("credential unavailable for {0}")]
    Unavailable(String),
    /// The credential backend itself failed
    #[error("credential store error: {0}")]
    Store(String),
}

/// Resolves a user id to a usable credential, refreshing behind the
/// scenes if the implementation supports it
#[async_trait]
pub trait CredentialResolver: Clone + Send + Sync + 'static {
    async fn resolve(&self, user_id: &str) -> Result<Credential, CredentialError>;
}

// =============================================================================
// Chat Transport
// =============================================================================

/// Proof of a successful send
#[derive(Debug, Clone)]
pub struct TransportReceipt {
    /// Provider message timestamp, when the provider returns one
    pub ts: Option<String>,
    /// Raw provider response, persisted with the attempt
    pub raw: Value,
}

/// Errors from the chat transport
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The provider answered with an error code
    #[error("transport api error: {code}")]
    Api { code: String, raw: Option<Value> },
    /// The provider could not be reached
    #[error("transport network error: {0}")]
    Network(String),
}

impl TransportError {
    /// Provider error code, if the provider answered at all
    pub fn code(&self) -> Option<&str> {
        match self {
            TransportError::Api { code, .. } => Some(code),
            TransportError::Network(_) => None,
        }
    }
}

/// Adapter for posting messages to a chat provider
#[async_trait]
pub trait ChatTransport: Clone + Send + Sync + 'static {
    async fn send(
        &self,
        channel_id: &str,
        text: &str,
        credential: &Credential,
    ) -> Result<TransportReceipt, TransportError>;
}
