//! Logging setup for the `multienv` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application, which can use [`init_logging`] or its own setup.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::ConfigError;

/// Env var that overrides the configured level with full filter directives.
pub const LOG_ENV_VAR: &str = "RUST_LOG";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
        }
    }
}

/// Install a stderr subscriber for `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. A second call keeps the
/// subscriber that is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_env_filter(config)?;
    let base_subscriber = Registry::default().with(filter);

    let installed = match config.format.as_str() {
        "json" => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        "text" => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        other => {
            return Err(ConfigError::InvalidLogging(format!(
                "unknown log format {:?}, expected json or text",
                other
            )))
        }
    };

    if installed.is_err() {
        tracing::debug!("a global subscriber is already installed");
    }
    Ok(())
}

/// Build the filter from RUST_LOG or the configured level.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV_VAR) {
        return Ok(filter);
    }
    build_level_filter(config)
}

/// Filter for `config.level`: a bare level, or full filter directives.
fn build_level_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    let invalid = |e: &dyn std::fmt::Display| {
        ConfigError::InvalidLogging(format!("invalid log level {:?}: {}", config.level, e))
    };
    // a bare word would otherwise be accepted as a target name
    if !config.level.contains(|c: char| c == '=' || c == ',') {
        LevelFilter::from_str(config.level.trim()).map_err(|e| invalid(&e))?;
    }
    EnvFilter::try_new(&config.level).map_err(|e| invalid(&e))
}
