//! Cluster nodes

use crate::condition::ConditionStatus;
use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Node condition types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeConditionType {
    /// Kubelet is healthy and accepting pods
    Ready,
    /// Memory pressure
    MemoryPressure,
    /// Disk pressure
    DiskPressure,
    /// Process id pressure
    #[serde(rename = "PIDPressure")]
    PidPressure,
    /// Network not configured
    NetworkUnavailable,
}

/// A `(type, status)` pair reported on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCondition {
    /// Condition type
    #[serde(rename = "type")]
    pub condition_type: NodeConditionType,
    /// Status value
    pub status: ConditionStatus,
}

/// Observed state of a node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Reported conditions, unordered
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
}

/// Cluster node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Object metadata
    pub metadata: ObjectMeta,
    /// Observed state
    #[serde(default)]
    pub status: NodeStatus,
}

impl Node {
    /// Create a node without conditions
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            status: NodeStatus::default(),
        }
    }

    /// Create a node reporting `Ready` with the given status
    #[inline]
    #[must_use]
    pub fn with_ready(name: impl Into<String>, status: ConditionStatus) -> Self {
        let mut node = Self::new(name);
        node.status.conditions.push(NodeCondition {
            condition_type: NodeConditionType::Ready,
            status,
        });
        node
    }

    /// Check for a `(Ready, True)` condition
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.conditions.iter().any(|c| {
            c.condition_type == NodeConditionType::Ready && c.status == ConditionStatus::True
        })
    }
}
