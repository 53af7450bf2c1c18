//! NNCP Sim - rollout simulator for policy conditions
//!
//! Runs controller replicas against simulated node agents on an in-memory
//! store and checks that the stored conditions settle on the state the
//! final enactment outcomes imply.

#![warn(unreachable_pub)]

pub mod simulator;

pub use simulator::{
    run_reset, run_rollout, AgentOutcome, ResetReport, RolloutConfig, RolloutReport, SimError,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
