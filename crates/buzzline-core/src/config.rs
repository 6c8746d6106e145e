use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64; // frames buffered per subscriber
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1_000; // stalled subscriber is evicted after this
pub const DEFAULT_KEEPALIVE_SECS: u64 = 15; // SSE comment heartbeat cadence

/// Top-level config (buzzline.toml + BUZZLINE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuzzlineConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub hub: HubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Broadcast hub tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Frames queued for one subscriber before writes start waiting.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// How long a single delivery may wait on a full subscriber queue.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Interval of `: keep-alive` comments on open streams. 0 disables them.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}
fn default_write_timeout_ms() -> u64 {
    DEFAULT_WRITE_TIMEOUT_MS
}
fn default_keepalive_secs() -> u64 {
    DEFAULT_KEEPALIVE_SECS
}

impl BuzzlineConfig {
    /// Load config from a TOML file with BUZZLINE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.buzzline/buzzline.toml
    ///
    /// A missing file is not an error: every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        let config: BuzzlineConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("BUZZLINE_").split("__"))
            .extract()
            .map_err(|e| crate::error::BuzzlineError::Config(e.to_string()))?;

        if config.hub.channel_capacity == 0 {
            return Err(crate::error::BuzzlineError::Config(
                "hub.channel_capacity must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.buzzline/buzzline.toml", home)
}
