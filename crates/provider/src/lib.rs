//! Nimbus resource-type handlers
//!
//! Each module under [`resources`] instantiates the shared reconciliation
//! engine for one remote resource type: it declares where the type lives in
//! the identifier hierarchy and how its flat configuration attributes map to
//! and from the remote property bag. Everything else (locking, existence
//! checks, long-running-operation waits, read-back) is the engine's job.

pub mod debug;
pub mod error;
pub mod resources;
pub mod state;

pub use error::{Error, Result};
