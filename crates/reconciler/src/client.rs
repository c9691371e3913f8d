//! External resource-mutation client contract
//!
//! The remote API (and its SDK) is not reimplemented here. The reconciler
//! only needs the four calls below, plus a way to wait out a long-running
//! operation the remote side acknowledged but has not finished applying.

use async_trait::async_trait;

use nimbus_common::error::RemoteError;
use nimbus_common::{ContainerSnapshot, ResourceIdentifier, Snapshot};

/// Result type for calls that cross into the remote system. Errors stay
/// opaque; the reconciler wraps them verbatim.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// A handle to an in-flight asynchronous remote mutation.
///
/// Has exactly two terminal outcomes: success or failure. The authoritative
/// post-mutation snapshot never comes from the handle; the reconciler always
/// issues a separate read-back, since the remote system may normalize or
/// default fields.
#[async_trait]
pub trait PendingOperation: Send {
    /// Block until the operation is terminal. Consumes the handle; it is
    /// discarded once terminal. Dropping the handle without waiting does not
    /// abort the remote operation.
    async fn wait(self: Box<Self>) -> RemoteResult<()>;
}

/// Outcome of issuing a mutating call.
pub enum MutationAck {
    /// The remote system applied the mutation synchronously.
    Applied,
    /// The remote system accepted the request; completion is pending.
    InFlight(Box<dyn PendingOperation>),
}

/// Client for the remote resource-mutation API.
///
/// Contract expected from implementations: `create_or_update` is idempotent
/// under retry with identical inputs, and `delete` succeeds when the child is
/// already absent. Transport-level timeouts belong to the implementation.
#[async_trait]
pub trait MutationClient: Send + Sync {
    /// Fetch existence and child listing for an owning container.
    /// `None` means the container does not exist.
    async fn fetch_container(
        &self,
        parent: &ResourceIdentifier,
    ) -> RemoteResult<Option<ContainerSnapshot>>;

    /// Fetch the authoritative state of one child. `None` means not found.
    async fn get_child(
        &self,
        parent: &ResourceIdentifier,
        name: &str,
    ) -> RemoteResult<Option<Snapshot>>;

    /// Create or fully replace a child. The property set is always complete;
    /// the remote call is never a partial patch.
    async fn create_or_update(
        &self,
        parent: &ResourceIdentifier,
        name: &str,
        properties: &serde_json::Value,
    ) -> RemoteResult<MutationAck>;

    /// Delete a child.
    async fn delete(&self, parent: &ResourceIdentifier, name: &str) -> RemoteResult<MutationAck>;
}
