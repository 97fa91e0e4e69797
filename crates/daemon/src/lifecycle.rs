//! Daemon startup and shutdown
//!
//! Wires the store, queue, scheduler, and worker pool together from the
//! loaded configuration, binds the unix socket, and tears everything down
//! again on shutdown.

use courier_adapters::{OauthClient, SlackTransport, StoredCredentialResolver};
use courier_core::clock::SystemClock;
use courier_core::id::UuidIdGen;
use courier_core::queue::DurableQueue;
use courier_core::storage::{JsonStore, StorageError};
use courier_engine::{Scheduler, Worker};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;

type DaemonResolver = StoredCredentialResolver<OauthClient, SystemClock>;

/// The concrete scheduler type the daemon runs
pub type DaemonScheduler = Scheduler<SystemClock, UuidIdGen, DaemonResolver, SlackTransport>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to bind socket {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the running daemon holds
pub struct DaemonState {
    pub config: Config,
    pub listener: UnixListener,
    pub store: JsonStore,
    pub queue: DurableQueue,
    pub scheduler: DaemonScheduler,
    pub workers: Vec<JoinHandle<()>>,
    pub start_time: Instant,
    pub shutdown_requested: bool,
    socket_path: PathBuf,
}

impl DaemonState {
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Stop the worker pool and remove the socket file
    pub async fn shutdown(&mut self) {
        info!("shutting down");
        for worker in self.workers.drain(..) {
            worker.abort();
        }
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(path = %self.socket_path.display(), error = %e, "failed to remove socket file");
            }
        }
        info!("shutdown complete");
    }
}

/// Open storage, start the worker pool, and bind the control socket
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    let store = JsonStore::open(&config.data_dir)?;
    let queue = DurableQueue::with_lease(
        store.clone(),
        "deliveries",
        Duration::from_secs(config.lease_secs),
    );

    if config.oauth_client_id.is_none() {
        warn!("no oauth client configured; expired tokens cannot be refreshed");
    }
    let refresher = OauthClient::with_base_url(
        &config.slack_base_url,
        config.oauth_client_id.clone().unwrap_or_default(),
        config.oauth_client_secret.clone().unwrap_or_default(),
    );
    let resolver = StoredCredentialResolver::new(store.clone(), refresher, SystemClock);
    let transport = SlackTransport::with_base_url(&config.slack_base_url);

    let scheduler = Scheduler::new(
        store.clone(),
        queue.clone(),
        SystemClock,
        UuidIdGen,
        resolver.clone(),
        transport.clone(),
    );

    let worker = Worker::new(
        store.clone(),
        queue.clone(),
        SystemClock,
        UuidIdGen,
        resolver,
        transport,
    )
    .with_concurrency(config.concurrency);

    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    let mut workers = Vec::new();
    for n in 0..config.num_workers.max(1) {
        let worker = worker.clone();
        workers.push(tokio::spawn(async move {
            info!(worker = n, "delivery worker started");
            if let Err(e) = worker.run(poll_interval).await {
                tracing::error!(worker = n, error = %e, "delivery worker stopped");
            }
        }));
    }

    let socket_path = config.socket_file();
    // A stale socket from a previous run would make the bind fail
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    let listener = UnixListener::bind(&socket_path)
        .map_err(|e| LifecycleError::BindFailed(socket_path.clone(), e))?;
    info!(socket = %socket_path.display(), workers = workers.len(), "daemon started");

    Ok(DaemonState {
        config: config.clone(),
        listener,
        store,
        queue,
        scheduler,
        workers,
        start_time: Instant::now(),
        shutdown_requested: false,
        socket_path,
    })
}
