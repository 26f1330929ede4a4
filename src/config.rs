use crate::error::AppError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POOL_LIST_URL: &str = "https://www.veggiecoin.io/pools.list";
pub const DEFAULT_RETRY_COOLDOWN_MS: u64 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PLACEHOLDER: &str = "WALLETADDRESS";
pub const DEFAULT_LOG_FILE: &str = "miner.log";
pub const DEFAULT_STOP_GRACE_MS: u64 = 3000;
pub const DEFAULT_KILL_TIMEOUT_MS: u64 = 2000;

/// Root configuration, deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pools: PoolsConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

/// Where the pool list comes from and how often it may be re-requested.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolsConfig {
    #[serde(default = "default_pool_list_url")]
    pub url: String,
    /// Minimum time between two retries, in milliseconds.
    #[serde(default = "default_retry_cooldown_ms")]
    pub retry_cooldown_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            url: default_pool_list_url(),
            retry_cooldown_ms: DEFAULT_RETRY_COOLDOWN_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl PoolsConfig {
    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_millis(self.retry_cooldown_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How the external miner is located, launched and stopped.
#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    /// Directory the miner executable and the log file are resolved against.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Token in the pool template replaced by the wallet address.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Time the miner gets to exit after a graceful terminate.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    /// Upper bound on waiting for a forced kill to be reaped.
    #[serde(default = "default_kill_timeout_ms")]
    pub kill_timeout_ms: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            placeholder: default_placeholder(),
            log_file: default_log_file(),
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
            kill_timeout_ms: DEFAULT_KILL_TIMEOUT_MS,
        }
    }
}

impl MinerConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    /// Resolves `path` against the working directory unless it is absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.resolve(&self.log_file)
    }
}

fn default_pool_list_url() -> String {
    DEFAULT_POOL_LIST_URL.to_string()
}

fn default_retry_cooldown_ms() -> u64 {
    DEFAULT_RETRY_COOLDOWN_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_stop_grace_ms() -> u64 {
    DEFAULT_STOP_GRACE_MS
}

fn default_kill_timeout_ms() -> u64 {
    DEFAULT_KILL_TIMEOUT_MS
}

/// Default config location: `<config dir>/pool-miner/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pool-miner").join("config.toml"))
}

/// Loads the config at `path`, falling back to defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<Config, AppError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse {}: {e}", path.display())))
}
