use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::client::DEFAULT_CLIENT_TIMEOUT;
use crate::service::DEFAULT_DEADLINE;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bind: Option<String>,
    /// Base URL of a `/proxy` relay; scraper fetches go through it when set
    pub relay_url: Option<String>,
    pub lang: Option<String>,
    pub deadline_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_capacity: Option<usize>,
    pub client_timeout_secs: Option<u64>,
    /// Transcript service the `fetch` command talks to
    pub server_url: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytscript/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn bind(&self) -> String {
        self.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    pub fn lang(&self) -> String {
        self.lang.clone().unwrap_or_else(|| "en".to_string())
    }

    /// Server-side deadline; the service clamps it to 8..=15 seconds
    pub fn deadline(&self) -> Duration {
        self.deadline_secs.map(Duration::from_secs).unwrap_or(DEFAULT_DEADLINE)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TTL)
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity.unwrap_or(DEFAULT_CAPACITY)
    }

    pub fn client_timeout(&self) -> Duration {
        self.client_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn server_url(&self) -> String {
        self.server_url
            .clone()
            .unwrap_or_else(|| format!("http://{DEFAULT_BIND}"))
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytscript")
        .join("config.toml")
}
