//! Daemon configuration
//!
//! Loaded from `courier.toml` in the data directory; every field has a
//! default so a bare directory works out of the box.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between worker polls of the queue
    pub poll_interval_secs: u64,
    /// Number of worker tasks
    pub num_workers: usize,
    /// Jobs each worker claims per batch
    pub concurrency: usize,
    /// Claim lease in seconds
    pub lease_secs: u64,
    /// Unix socket path; defaults to `courierd.sock` in the data dir
    pub socket_path: Option<PathBuf>,
    /// Slack Web API base URL
    pub slack_base_url: String,
    /// OAuth client credentials for token refresh
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    /// Data directory, set from the command line rather than the file
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            num_workers: 2,
            concurrency: 2,
            lease_secs: 300,
            socket_path: None,
            slack_base_url: "https://slack.com/api".to_string(),
            oauth_client_id: None,
            oauth_client_secret: None,
            data_dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load `courier.toml` from the data directory, falling back to
    /// defaults when the file is absent
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join("courier.toml");
        let mut config: Config = if path.exists() {
            toml::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            Config::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn socket_file(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("courierd.sock"))
    }
}
