//! Stored object kinds
//!
//! - [`Policy`]: cluster-wide configuration intent with aggregate conditions
//! - [`Enactment`]: per-node outcome of applying a policy
//! - [`Node`]: cluster node with its readiness conditions

mod enactment;
mod node;
mod policy;

pub use enactment::{Enactment, EnactmentConditionType, EnactmentStatus, ENACTMENT_POLICY_LABEL};
pub use node::{Node, NodeCondition, NodeConditionType, NodeStatus};
pub use policy::{Policy, PolicyConditionReason, PolicyConditionType, PolicyStatus};
