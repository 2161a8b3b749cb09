//! Configuration types for httprec

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::replay::MatchPolicy;
use crate::{HttprecError, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory scenario names are resolved against
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: PathBuf,
    /// Recording settings
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Replay settings
    #[serde(default)]
    pub replay: ReplayConfig,
}

fn default_fixtures_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixtures_dir: default_fixtures_dir(),
            recorder: RecorderConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

/// Recorder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Overall per-request timeout in milliseconds, body included
    pub request_timeout_ms: u64,
    /// Maximum number of hops recorded for one sequence
    pub max_hops: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 15_000,
            max_hops: crate::recording::MAX_HOPS,
        }
    }
}

impl RecorderConfig {
    /// Connect timeout as a [`Duration`]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout as a [`Duration`]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Replay settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Which recorded steps may answer a request
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HttprecError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| HttprecError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.fixtures_dir.as_os_str().is_empty() {
            return Err(HttprecError::ConfigError(
                "fixtures_dir cannot be empty".to_string(),
            ));
        }

        if self.recorder.connect_timeout_ms == 0 {
            return Err(HttprecError::ConfigError(
                "recorder.connect_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.recorder.request_timeout_ms < self.recorder.connect_timeout_ms {
            return Err(HttprecError::ConfigError(format!(
                "recorder.request_timeout_ms ({}) is shorter than connect_timeout_ms ({})",
                self.recorder.request_timeout_ms, self.recorder.connect_timeout_ms
            )));
        }

        if self.recorder.max_hops == 0 {
            return Err(HttprecError::ConfigError(
                "recorder.max_hops must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
