//! Controller configuration
//!
//! Loaded from TOML or YAML; every field has a default.
//!
//! ```toml
//! [retry]
//! max_attempts = 5
//! initial_delay_ms = 10
//! strategy = "exponential"
//! jitter = 0.1
//! ```

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Policy conditions configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionsConfig {
    /// Conflict retry policy for status writes
    pub retry: RetryPolicy,
}

impl ConditionsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML or out-of-range values
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML
    ///
    /// # Errors
    /// Returns error on malformed YAML or out-of-range values
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            Some("yaml" | "yml") => Self::from_yaml_str(&source),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns `Invalid` if jitter is negative or not finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.retry.jitter.is_finite() || self.retry.jitter < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "retry.jitter must be a non-negative number, got {}",
                self.retry.jitter
            )));
        }
        Ok(())
    }
}
