//! World and frame-loop configuration.
//!
//! Settings come from, in increasing precedence: built-in defaults, an
//! optional JSON file named by [`CONFIG_PATH_ENV`], and individual
//! environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "ENGINE_CONFIG";

/// Environment variable overriding [`WorldConfig::tick_rate`].
pub const TICK_RATE_ENV: &str = "ENGINE_TICK_RATE";

/// Environment variable overriding [`WorldConfig::max_ticks`].
pub const MAX_TICKS_ENV: &str = "ENGINE_MAX_TICKS";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`WorldConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A setting has an unusable value.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// The setting or environment variable.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Runtime settings for a world and its frame loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Target frames per second.
    pub tick_rate: f64,
    /// Maximum number of frames to run (0 = unlimited).
    pub max_ticks: u64,
    /// Disable a system after it returns an error or panics.
    pub auto_disable_faulty_systems: bool,
    /// Entity slots to reserve up front.
    pub entity_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
            auto_disable_faulty_systems: true,
            entity_capacity: 0,
        }
    }
}

impl WorldConfig {
    /// Load defaults, then the file named by `ENGINE_CONFIG` if set, then the
    /// `ENGINE_TICK_RATE` and `ENGINE_MAX_TICKS` overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::InvalidValue`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    /// Read and parse a JSON file.
    ///
    /// # Errors
    ///
    /// See [`WorldConfig::from_json_str`]; also [`ConfigError::Io`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Apply overrides looked up by environment variable name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if an override does not parse
    /// or the result is out of range.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(TICK_RATE_ENV) {
            self.tick_rate = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: TICK_RATE_ENV,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(MAX_TICKS_ENV) {
            self.max_ticks = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: MAX_TICKS_ENV,
                value: raw.clone(),
            })?;
        }
        self.validate()
    }

    /// Override the tick rate. The value is checked by
    /// [`WorldConfig::tick_duration`], and so by [`TickLoop::new`](crate::TickLoop::new).
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Override the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Wall-clock budget of one frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] unless the tick rate is finite,
    /// positive and large enough for its period to fit in a [`Duration`].
    pub fn tick_duration(&self) -> Result<Duration, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: "tick_rate",
            value: self.tick_rate.to_string(),
        };
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            return Err(invalid());
        }
        Duration::try_from_secs_f64(1.0 / self.tick_rate).map_err(|_| invalid())
    }

    fn validate(self) -> Result<Self, ConfigError> {
        self.tick_duration()?;
        Ok(self)
    }
}
