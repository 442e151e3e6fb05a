use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./fetcher.db")
}

/// Scheduler timing and fan-out settings
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct SchedulerConfig {
    /// Period between two ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Total timeout of one fetch, connect to body read
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Upper bound on fetches running at once; unbounded if absent
    pub max_concurrent_fetches: Option<usize>,
}

impl SchedulerConfig {
    /// Tick period, never shorter than one millisecond
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Fetch timeout, never shorter than one second
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_concurrent_fetches: None,
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

/// HTTP API settings
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "crate::util::get_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: crate::util::get_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiSettings,
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
