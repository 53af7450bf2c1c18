//! NNCP Store
//!
//! Boundary between the status controller and the cluster object store.
//!
//! # Core Concepts
//!
//! - [`ObjectStore`]: Async collaborator trait (get, list, version-checked status write)
//! - [`StoreError`]: Structured error with a [`StoreErrorKind`] fixed at creation
//! - [`InMemoryStore`]: Reference store used by tests and the simulator

#![warn(unreachable_pub)]

mod error;
mod memory;
mod store;

pub use error::{ObjectKind, StoreError, StoreErrorKind};
pub use memory::{InMemoryStore, StoreStats};
pub use store::ObjectStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
