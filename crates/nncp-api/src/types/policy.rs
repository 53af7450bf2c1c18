//! Node network configuration policy

use crate::condition::ConditionList;
use crate::meta::{ObjectKey, ObjectMeta};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Condition types reported on a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyConditionType {
    /// Rollout is usable on the nodes it targets
    Available,
    /// Rollout failed on at least one node
    Degraded,
}

impl Display for PolicyConditionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => f.write_str("Available"),
            Self::Degraded => f.write_str("Degraded"),
        }
    }
}

/// Reasons attached to policy conditions
///
/// Declared in the priority order the aggregate decision evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyConditionReason {
    /// Fewer enactments finished than nodes are ready
    ConfigurationProgressing,
    /// No node matches the policy selector
    ConfigurationNoMatchingNode,
    /// At least one matching node failed
    FailedToConfigure,
    /// Every matching node applied the configuration
    SuccessfullyConfigured,
}

impl PolicyConditionReason {
    /// Reason string stored on the condition
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationProgressing => "ConfigurationProgressing",
            Self::ConfigurationNoMatchingNode => "ConfigurationNoMatchingNode",
            Self::FailedToConfigure => "FailedToConfigure",
            Self::SuccessfullyConfigured => "SuccessfullyConfigured",
        }
    }
}

impl Display for PolicyConditionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of a policy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyStatus {
    /// Aggregate conditions
    #[serde(default)]
    pub conditions: ConditionList<PolicyConditionType>,
}

/// Cluster-wide network configuration intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Object metadata
    pub metadata: ObjectMeta,
    /// Observed state
    #[serde(default)]
    pub status: PolicyStatus,
}

impl Policy {
    /// Create a policy with an empty status
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            status: PolicyStatus::default(),
        }
    }

    /// Policy name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Key addressing this policy
    #[inline]
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }
}
