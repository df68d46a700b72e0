use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::{Validate, ValidationError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_FRESHNESS_SECS: u64 = 300;
const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Statistics-cache configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StatsConfig {
    /// Maximum snapshot age before `get_stats` recomputes, in seconds.
    #[serde(default = "default_freshness_secs")]
    #[validate(custom = "validate_freshness_secs")]
    pub freshness_secs: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
        }
    }
}

/// Domain-event channel configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    #[serde(default = "default_event_capacity")]
    #[validate(custom = "validate_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_event_capacity(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    #[validate]
    pub stats: StatsConfig,

    #[serde(default)]
    #[validate]
    pub events: EventsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_env(),
            log_level: default_log_level(),
            log_json: false,
            stats: StatsConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

fn default_env() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_freshness_secs() -> u64 {
    DEFAULT_FRESHNESS_SECS
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

fn validate_freshness_secs(secs: u64) -> Result<(), ValidationError> {
    if secs == 0 || secs > 86_400 {
        let mut err = ValidationError::new("freshness_secs");
        err.message = Some("freshness_secs must be between 1 and 86400".into());
        return Err(err);
    }
    Ok(())
}

fn validate_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("channel_capacity");
        err.message = Some("channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Loads configuration layered from `config/default.toml`, an optional
/// `config/{run_mode}.toml` and `APP__`-prefixed environment variables
/// (e.g. `APP__STATS__FRESHNESS_SECS=60`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let config: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_mode)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    config
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;
    Ok(config)
}

/// Installs the global tracing subscriber. `RUST_LOG` overrides the
/// configured level when set and non-empty.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("retail_stock={}", level);
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    // A second init (tests, embedding hosts) keeps the first subscriber.
    if json {
        let _ = fmt().with_env_filter(EnvFilter::new(filter)).json().try_init();
    } else {
        let _ = fmt().with_env_filter(EnvFilter::new(filter)).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.stats.freshness_secs, 300);
        assert_eq!(cfg.events.channel_capacity, 1024);
        assert_eq!(cfg.log_level(), "info");
    }

    #[test]
    fn out_of_range_freshness_fails_validation() {
        let cfg = AppConfig {
            stats: StatsConfig { freshness_secs: 0 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_channel_capacity_fails_validation() {
        let cfg = AppConfig {
            events: EventsConfig { channel_capacity: 0 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
