//! Slack chat transport
//!
//! Posts messages through `chat.postMessage`. The HTTP client is blocking,
//! so calls run on the blocking thread pool. The base URL is injectable so
//! tests can point the transport at a local server.

use async_trait::async_trait;
use courier_core::adapters::{ChatTransport, Credential, TransportError, TransportReceipt};
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Chat transport backed by the Slack Web API
#[derive(Clone)]
pub struct SlackTransport {
    base_url: String,
}

impl SlackTransport {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for SlackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for SlackTransport {
    async fn send(
        &self,
        channel_id: &str,
        text: &str,
        credential: &Credential,
    ) -> Result<TransportReceipt, TransportError> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let token = credential.access_token.clone();
        let body = serde_json::json!({
            "channel": channel_id,
            "text": text,
        });

        let raw = tokio::task::spawn_blocking(move || post_json(&url, &token, &body))
            .await
            .map_err(|e| TransportError::Network(format!("send task failed: {}", e)))??;

        parse_post_message(raw)
    }
}

fn post_json(url: &str, token: &str, body: &Value) -> Result<Value, TransportError> {
    let mut response = ureq::post(url)
        .header("Authorization", &format!("Bearer {}", token))
        .send_json(body)
        .map_err(|e| TransportError::Network(e.to_string()))?;
    response
        .body_mut()
        .read_json::<Value>()
        .map_err(|e| TransportError::Network(format!("failed to read response: {}", e)))
}

/// Interpret a `chat.postMessage` response body. Slack answers HTTP 200
/// for API-level errors and signals them through `ok: false`.
fn parse_post_message(raw: Value) -> Result<TransportReceipt, TransportError> {
    let ok = raw.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if ok {
        let ts = raw
            .get("ts")
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        Ok(TransportReceipt { ts, raw })
    } else {
        let code = raw
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        Err(TransportError::Api {
            code,
            raw: Some(raw),
        })
    }
}
