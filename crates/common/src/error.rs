//! Error types for the Nimbus provider

use std::time::Duration;

use thiserror::Error;

use crate::types::Intent;

/// Result type alias using the provider Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by an external collaborator (remote API client,
/// pending-operation handle). Kept opaque; the reconciler wraps them
/// verbatim rather than interpreting them.
pub type RemoteError = Box<dyn std::error::Error + Send + Sync>;

/// Provider error taxonomy
///
/// Each variant carries enough context (identifier, attempted intent) to be
/// actionable by the caller. The reconciler performs no local recovery: the
/// caller's retry policy decides what happens next for each variant.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed resource identifier. Never retried; the input must be fixed.
    #[error("invalid resource identifier {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: String },

    /// An object the mutation depends on does not exist: the owning
    /// container, or for amend-only types the amended object itself.
    /// Retried by the caller once the dependency has been reconciled,
    /// never internally.
    #[error("dependency {parent} of {id} does not exist")]
    DependencyMissing { id: String, parent: String },

    /// A remote call failed. Wraps the transport/API error verbatim;
    /// transient and permanent failures are not differentiated here.
    #[error("remote call failed for {id} during {intent}")]
    RemoteCall {
        id: String,
        intent: Intent,
        #[source]
        source: RemoteError,
    },

    /// A pending operation did not reach a terminal state within its budget.
    /// The remote mutation may or may not have completed; the true state is
    /// only discoverable by reconciling again.
    #[error("operation for {id} during {intent} did not complete within {budget:?}")]
    OperationTimedOut {
        id: String,
        intent: Intent,
        budget: Duration,
    },

    /// The read-back after a successful create found no object. Fatal
    /// inconsistency, surfaced as-is.
    #[error("resource {id} not found after create completed")]
    ChildNotFoundAfterCreate { id: String },

    /// The caller's cancellation signal fired. Not an error condition for
    /// alerting purposes; any issued remote mutation may still complete.
    #[error("reconciliation of {id} was cancelled")]
    Cancelled { id: String },
}

impl Error {
    /// Whether re-running the same reconciliation could possibly succeed.
    /// `InvalidIdentifier` and `ChildNotFoundAfterCreate` need operator
    /// attention first.
    pub fn retriable(&self) -> bool {
        !matches!(
            self,
            Error::InvalidIdentifier { .. } | Error::ChildNotFoundAfterCreate { .. }
        )
    }
}
