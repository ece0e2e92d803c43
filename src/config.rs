// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, defaults, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! Environment-based configuration management

use crate::constants::trial;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the AI relay endpoint
    pub relay_url: String,
    /// Request timeout for relay calls, in seconds
    pub relay_timeout_secs: u64,
    /// Trial window length in days, granted at registration
    pub trial_days: i64,
    /// Path of the on-disk session store
    pub store_path: PathBuf,
    /// Log level
    pub log_level: LogLevel,
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable store path can be resolved.
    pub fn from_env() -> Result<Self> {
        let relay_url = env::var("NUTRIBOT_RELAY_URL")
            .unwrap_or_else(|_| "http://localhost:8788/api/assistant".into());

        let relay_timeout_secs = env::var("NUTRIBOT_RELAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let trial_days = env::var(trial::ENV_VAR)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                warn!(
                    "{} not set or unparsable, using default of {} days",
                    trial::ENV_VAR,
                    trial::TRIAL_DAYS
                );
                trial::TRIAL_DAYS
            });

        let store_path = match env::var("NUTRIBOT_STORE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => Self::default_store_path()?,
        };

        let log_level = env::var("RUST_LOG")
            .map(|s| LogLevel::from_str_or_default(&s))
            .unwrap_or_default();

        Ok(Self {
            relay_url,
            relay_timeout_secs,
            trial_days,
            store_path,
            log_level,
        })
    }

    /// Resolve the default on-disk store location under the platform data dir
    fn default_store_path() -> Result<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("could not resolve a platform data directory"))?;
        Ok(base.join("nutribot").join("sessions.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str_or_default("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_or_default("nonsense"), LogLevel::Info);
    }

    #[test]
    fn test_log_level_display_roundtrip() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert_eq!(LogLevel::from_str_or_default(&level.to_string()), level);
        }
    }
}
