//! NNCP Conditions - aggregate policy status
//!
//! Computes the `Available` and `Degraded` conditions of a node network
//! configuration policy from the outcomes of its per-node enactments, and
//! persists them under optimistic concurrency:
//! - Counts enactment outcomes and ready nodes through replaceable collaborators
//! - Decides one of four aggregate states in a fixed priority order
//! - Retries the whole read-compute-write cycle when the status write conflicts
//!
//! # Example
//!
//! ```rust,ignore
//! use nncp_conditions::PolicyConditions;
//! use nncp_api::ObjectKey;
//!
//! let conditions = PolicyConditions::new(store);
//! conditions.update(&ObjectKey::cluster_scoped("bond0")).await?;
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod aggregate;
pub mod conditions;
pub mod config;
pub mod counts;
pub mod error;
pub mod retry;

// Re-exports for convenience
pub use aggregate::{ConditionUpdate, PolicyConditionState};
pub use conditions::PolicyConditions;
pub use config::ConditionsConfig;
pub use counts::{
    ConditionCounter, EnactmentCounter, EnactmentCounts, NodeReadyProbe, ReadinessProbe,
};
pub use error::{ConditionsError, ConfigError};
pub use retry::{BackoffStrategy, Conflict, ConflictRetryExecutor, RetryPolicy};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with policy conditions
    pub use crate::{
        ConditionsConfig, ConditionsError, ConflictRetryExecutor, EnactmentCounts,
        PolicyConditionState, PolicyConditions, RetryPolicy,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
