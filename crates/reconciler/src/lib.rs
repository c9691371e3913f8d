//! Resource-mutation admission and reconciliation
//!
//! This crate owns the one piece of control flow every Nimbus resource type
//! shares: serialize concurrent operations on the same remote object, fetch
//! current remote state, issue at most one mutating call, wait out any
//! long-running operation, and reflect the authoritative outcome back into
//! the caller's desired-state record.
//!
//! The remote API itself is an external collaborator reached through the
//! [`client::MutationClient`] trait; this crate never interprets its errors
//! beyond wrapping them with identifier and intent context.

pub mod client;
pub mod locks;
pub mod reconciler;
pub mod timeouts;

pub use client::{MutationAck, MutationClient, PendingOperation};
pub use locks::{LockGuard, LockTable};
pub use reconciler::{Outcome, Reconciler, ResourceDescriptor};
pub use timeouts::OperationTimeouts;
