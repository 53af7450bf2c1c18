//! Error types for policy condition updates
//!
//! Every variant wraps the [`StoreError`] that caused it, and the
//! classification helpers answer from that error's kind directly.

use crate::retry::Conflict;
use nncp_store::{StoreError, StoreErrorKind};

/// Failure of an `update` or `reset`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionsError {
    /// Policy read failed
    #[error("getting policy failed: {0}")]
    GetPolicy(#[source] StoreError),

    /// Enactment listing failed
    #[error("getting enactments failed: {0}")]
    GetEnactments(#[source] StoreError),

    /// Node listing failed
    #[error("getting nodes failed: {0}")]
    GetNodes(#[source] StoreError),

    /// Status write failed
    #[error("updating policy status failed: {0}")]
    UpdateStatus(#[source] StoreError),
}

impl ConditionsError {
    /// Underlying store error
    #[inline]
    #[must_use]
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::GetPolicy(e) | Self::GetEnactments(e) | Self::GetNodes(e) | Self::UpdateStatus(e) => e,
        }
    }

    /// Kind of the underlying store error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        self.store_error().kind()
    }

    /// Check if the error is an optimistic-concurrency conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == StoreErrorKind::Conflict
    }

    /// Check if the error came from a read
    #[inline]
    #[must_use]
    pub fn is_retrieval(&self) -> bool {
        !matches!(self, Self::UpdateStatus(_))
    }
}

impl Conflict for ConditionsError {
    fn is_conflict(&self) -> bool {
        ConditionsError::is_conflict(self)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("reading config {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// TOML parse failure
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parse failure
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File extension not recognised
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Parsed but out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}
