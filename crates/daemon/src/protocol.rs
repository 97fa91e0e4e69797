//! Wire protocol for client-daemon communication
//!
//! Messages are a 4-byte big-endian length prefix followed by a JSON
//! document. Reads and writes go through timeouts so a stalled client
//! cannot wedge the daemon.

use chrono::{DateTime, Utc};
use courier_engine::views::{ScheduledMessage, SentMessage};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a single message; anything larger is a protocol error
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message too large: {0} bytes")]
    TooLarge(usize),
    #[error("timed out")]
    Timeout,
    #[error("connection closed")]
    ConnectionClosed,
}

/// Requests a client can make
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Status,
    Schedule {
        user_id: String,
        channel_id: String,
        text: String,
        scheduled_time: Option<DateTime<Utc>>,
    },
    Cancel {
        user_id: String,
        delivery_id: String,
    },
    ListScheduled {
        user_id: String,
    },
    ListSent {
        user_id: String,
    },
    Shutdown,
}

/// Responses the daemon sends back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Status {
        uptime_secs: u64,
        queue_depth: usize,
        workers: usize,
    },
    Scheduled {
        delivery_id: String,
        status: String,
    },
    Ok,
    ScheduledList {
        messages: Vec<ScheduledMessage>,
    },
    SentList {
        messages: Vec<SentMessage>,
    },
    Error {
        message: String,
    },
    ShuttingDown,
}

/// Encode a value as raw JSON (no length prefix)
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a value from raw JSON
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write a length-prefixed message
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(ProtocolError::ConnectionClosed);
        }
        return Err(e.into());
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(len));
    }

    let mut buf = vec![0u8; len];
    if let Err(e) = reader.read_exact(&mut buf).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(ProtocolError::ConnectionClosed);
        }
        return Err(e.into());
    }
    Ok(buf)
}

/// Read and decode a request, bounded by `limit`
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    limit: Duration,
) -> Result<Request, ProtocolError> {
    match timeout(limit, read_message(reader)).await {
        Ok(bytes) => decode(&bytes?),
        Err(_) => Err(ProtocolError::Timeout),
    }
}

/// Encode and write a response, bounded by `limit`
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    limit: Duration,
) -> Result<(), ProtocolError> {
    let bytes = encode(response)?;
    match timeout(limit, write_message(writer, &bytes)).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
