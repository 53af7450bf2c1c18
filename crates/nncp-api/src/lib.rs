//! NNCP API
//!
//! Object model shared by the status controller and its store.
//!
//! # Core Concepts
//!
//! - [`ConditionList<T>`]: Ordered, type-keyed upsert collection of conditions
//! - [`Policy`]: Cluster-wide configuration intent carrying aggregate conditions
//! - [`Enactment`]: Per-node outcome of a policy, labeled with its owner
//! - [`Node`]: Cluster node reporting readiness
//! - [`ObjectKey`] / [`LabelSelector`]: Addressing and filtering
//!
//! # Example
//!
//! ```rust
//! use nncp_api::{ConditionList, ConditionStatus, PolicyConditionType};
//!
//! let mut conditions = ConditionList::new();
//! conditions.set(PolicyConditionType::Degraded, ConditionStatus::False, "SuccessfullyConfigured", "");
//! conditions.set(PolicyConditionType::Degraded, ConditionStatus::True, "FailedToConfigure", "1/3 nodes failed to configure");
//! assert_eq!(conditions.len(), 1);
//! ```

#![warn(unreachable_pub)]

// Core modules
mod condition;
mod meta;
pub mod types;

// Re-exports
pub use condition::{Condition, ConditionKind, ConditionList, ConditionStatus};
pub use meta::{LabelSelector, ObjectKey, ObjectMeta};
pub use types::{
    Enactment, EnactmentConditionType, EnactmentStatus, Node, NodeCondition, NodeConditionType,
    NodeStatus, Policy, PolicyConditionReason, PolicyConditionType, PolicyStatus,
    ENACTMENT_POLICY_LABEL,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
