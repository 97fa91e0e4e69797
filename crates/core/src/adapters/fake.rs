//! Fake adapter implementations for testing

use super::traits::*;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A recorded transport send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: String,
    pub text: String,
    pub token: String,
}

#[derive(Default)]
struct FakeTransportState {
    /// Scripted outcomes, consumed front to back; empty means success
    script: VecDeque<Result<TransportReceipt, TransportError>>,
    sent: Vec<SentMessage>,
}

/// Fake chat transport with call recording and scripted outcomes
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeTransportState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful send with the given provider timestamp
    pub fn push_ok(&self, ts: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.script.push_back(Ok(TransportReceipt {
            ts: Some(ts.to_string()),
            raw: serde_json::json!({ "ok": true, "ts": ts }),
        }));
    }

    /// Script a provider error with the given code
    pub fn push_api_error(&self, code: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.script.push_back(Err(TransportError::Api {
            code: code.to_string(),
            raw: Some(serde_json::json!({ "ok": false, "error": code })),
        }));
    }

    /// Script a network failure
    pub fn push_network_error(&self, message: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .script
            .push_back(Err(TransportError::Network(message.to_string())));
    }

    /// All sends recorded so far
    pub fn sends(&self) -> Vec<SentMessage> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sent.clone()
    }

    pub fn send_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sent.len()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(
        &self,
        channel_id: &str,
        text: &str,
        credential: &Credential,
    ) -> Result<TransportReceipt, TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sent.push(SentMessage {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
            token: credential.access_token.clone(),
        });
        match state.script.pop_front() {
            Some(outcome) => outcome,
            None => Ok(TransportReceipt {
                ts: Some("0000000000.000000".to_string()),
                raw: serde_json::json!({ "ok": true }),
            }),
        }
    }
}

#[derive(Default)]
struct FakeResolverState {
    tokens: HashMap<String, String>,
    store_error: Option<String>,
}

/// Fake credential resolver backed by an in-memory token table
#[derive(Clone, Default)]
pub struct FakeCredentialResolver {
    state: Arc<Mutex<FakeResolverState>>,
}

impl FakeCredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a token to a user
    pub fn grant(&self, user_id: &str, token: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.tokens.insert(user_id.to_string(), token.to_string());
    }

    /// Revoke a user's token
    pub fn revoke(&self, user_id: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.tokens.remove(user_id);
    }

    /// Make every resolve fail with a backend error until cleared
    pub fn fail_with_store_error(&self, message: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.store_error = Some(message.to_string());
    }

    pub fn clear_store_error(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.store_error = None;
    }
}

#[async_trait]
impl CredentialResolver for FakeCredentialResolver {
    async fn resolve(&self, user_id: &str) -> Result<Credential, CredentialError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(message) = &state.store_error {
            return Err(CredentialError::Store(message.clone()));
        }
        state
            .tokens
            .get(user_id)
            .map(|token| Credential::new(token.clone()))
            .ok_or_else(|| CredentialError::Unavailable(user_id.to_string()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
