//! Connection handling and request dispatch
//!
//! One request and one response per connection. Anything the engine
//! rejects comes back as a `Response::Error` rather than dropping the
//! connection.

use courier_core::delivery::DeliveryId;
use courier_engine::views;
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::{debug, error};

use crate::lifecycle::DaemonState;
use crate::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("client timed out")]
    Timeout,
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Serve a single client connection
pub async fn handle_connection(
    daemon: &mut DaemonState,
    stream: UnixStream,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(request) => request,
        Err(ProtocolError::Timeout) => {
            error!("client timed out sending request");
            return Err(ServerError::Timeout);
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("client disconnected before sending a request");
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "failed to read request");
            return Err(e.into());
        }
    };

    debug!(?request, "handling request");
    let response = handle_request(daemon, request).await;
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Dispatch a request against the daemon state
pub async fn handle_request(daemon: &mut DaemonState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Status => match daemon.queue.depth().await {
            Ok(queue_depth) => Response::Status {
                uptime_secs: daemon.start_time.elapsed().as_secs(),
                queue_depth,
                workers: daemon.workers.len(),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Request::Schedule {
            user_id,
            channel_id,
            text,
            scheduled_time,
        } => {
            let status = if scheduled_time.is_some() {
                "queued"
            } else {
                "sent"
            };
            match daemon
                .scheduler
                .schedule(&user_id, &channel_id, &text, scheduled_time)
                .await
            {
                Ok(delivery_id) => Response::Scheduled {
                    delivery_id: delivery_id.0,
                    status: status.to_string(),
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }
        Request::Cancel {
            user_id,
            delivery_id,
        } => match daemon
            .scheduler
            .cancel(&DeliveryId(delivery_id), &user_id)
            .await
        {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Request::ListScheduled { user_id } => match views::list_scheduled(&daemon.store, &user_id) {
            Ok(messages) => Response::ScheduledList { messages },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Request::ListSent { user_id } => match views::list_sent(&daemon.store, &user_id) {
            Ok(messages) => Response::SentList { messages },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Request::Shutdown => {
            daemon.shutdown_requested = true;
            Response::ShuttingDown
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
