//! Common types for the Nimbus provider
//!
//! Shared between the reconciliation engine and the per-resource-type
//! handlers: hierarchical resource identifiers, remote-state snapshots,
//! and the provider error taxonomy.

pub mod error;
pub mod id;
pub mod types;

pub use error::{Error, Result};
pub use id::ResourceIdentifier;
pub use types::{ContainerSnapshot, DesiredStateRecord, Intent, Snapshot};
