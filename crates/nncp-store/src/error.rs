//! Store error types
//!
//! Errors carry a [`StoreErrorKind`] assigned where they are created, so
//! callers classify them without inspecting messages or cause chains.

use std::fmt::{self, Display, Formatter};

/// Kind of stored object, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Node network configuration policy
    Policy,
    /// Per-node enactment
    Enactment,
    /// Cluster node
    Node,
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy => f.write_str("policy"),
            Self::Enactment => f.write_str("enactment"),
            Self::Node => f.write_str("node"),
        }
    }
}

/// Classification of a store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Object does not exist
    NotFound,
    /// Object already exists
    AlreadyExists,
    /// Write rejected because the stored version changed since the read
    Conflict,
    /// Anything else (transport, server, validation)
    Other,
}

impl Display for StoreErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::AlreadyExists => f.write_str("already exists"),
            Self::Conflict => f.write_str("conflict"),
            Self::Other => f.write_str("store error"),
        }
    }
}

/// Error returned by an [`ObjectStore`](crate::ObjectStore)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    /// Create error of a given kind
    #[inline]
    #[must_use]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Object missing
    #[must_use]
    pub fn not_found(object: ObjectKind, name: impl Display) -> Self {
        Self::new(StoreErrorKind::NotFound, format!("{object} \"{name}\""))
    }

    /// Object present on create
    #[must_use]
    pub fn already_exists(object: ObjectKind, name: impl Display) -> Self {
        Self::new(StoreErrorKind::AlreadyExists, format!("{object} \"{name}\""))
    }

    /// Stale write
    #[must_use]
    pub fn conflict(object: ObjectKind, name: impl Display, expected: u64, actual: u64) -> Self {
        Self::new(
            StoreErrorKind::Conflict,
            format!(
                "operation cannot be fulfilled on {object} \"{name}\": \
                 the object has been modified (resource version {expected}, stored {actual})"
            ),
        )
    }

    /// Unclassified failure
    #[inline]
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Other, message)
    }

    /// Error classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    /// Check for an optimistic-concurrency conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind == StoreErrorKind::Conflict
    }

    /// Check for a missing object
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }

    /// Error message without the kind prefix
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_set_at_creation() {
        assert!(StoreError::conflict(ObjectKind::Policy, "p", 1, 2).is_conflict());
        assert!(StoreError::not_found(ObjectKind::Node, "n").is_not_found());
        assert!(!StoreError::other("boom").is_conflict());
        assert_eq!(
            StoreError::already_exists(ObjectKind::Enactment, "e").kind(),
            StoreErrorKind::AlreadyExists
        );
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = StoreError::not_found(ObjectKind::Policy, "bond0");
        assert_eq!(err.to_string(), "not found: policy \"bond0\"");
    }
}
