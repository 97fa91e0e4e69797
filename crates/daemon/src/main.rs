//! Courier daemon (courierd)
//!
//! Runs the delivery worker pool and serves scheduling requests over a
//! unix socket. Takes the data directory as its only argument.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod config;
mod lifecycle;
mod protocol;
mod server;

use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::Config;

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry().with(filter).with(layer).init();
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    setup_logging();

    let data_dir = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    let config = match Config::load(&data_dir) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!(error = %e, "failed to start daemon");
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %daemon.socket_path().display(), "ready for connections");
    println!("READY");

    loop {
        tokio::select! {
            result = daemon.listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        if let Err(e) = server::handle_connection(&mut daemon, stream).await {
                            error!(error = %e, "connection handling failed");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed");
                    }
                }
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                daemon.shutdown().await;
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
                daemon.shutdown().await;
                break;
            }
        }

        if daemon.shutdown_requested {
            daemon.shutdown().await;
            break;
        }
    }

    info!("daemon stopped");
    Ok(())
}
