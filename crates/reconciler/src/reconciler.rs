//! The resource reconciliation state machine
//!
//! Drives one resource instance from its current remote state toward (or
//! away from, for deletion) the caller's desired state, using at most one
//! remote mutating call per invocation:
//!
//! parse id -> acquire admission lock -> fetch container -> branch on intent
//! -> issue mutation -> wait out pending operation -> read back -> release.
//!
//! Every suspension point observes the caller's cancellation token. On any
//! failure after the mutation was issued the remote system may have changed;
//! the reconciler never rolls back, it reports and lets the next pass
//! converge again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nimbus_common::error::{Error, Result};
use nimbus_common::{DesiredStateRecord, Intent, ResourceIdentifier, Snapshot};

use crate::client::{MutationAck, MutationClient};
use crate::locks::LockTable;
use crate::timeouts::OperationTimeouts;

/// Static description of one resource type, written once per type next to
/// its expand/flatten code.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor {
    /// Configuration-facing type name, e.g. `nimbus_lb_backend_address_pool`.
    pub type_name: &'static str,
    /// Collection key expected as the terminal identifier segment,
    /// e.g. `backendAddressPools`.
    pub collection: &'static str,
    /// Serialize against siblings through the owning container instead of
    /// the child's own identifier. Child entities that are stored inside
    /// their container's representation on the remote side need this.
    pub lock_parent: bool,
    /// The type amends an object some other resource owns; its mutation
    /// never implies creation. CreateOrUpdate on an absent child fails
    /// with [`Error::DependencyMissing`] instead of creating it.
    pub amend_only: bool,
}

/// Result of a successful reconciliation pass.
#[derive(Debug)]
pub enum Outcome {
    /// The remote object exists; the snapshot is a real post-mutation fetch.
    Converged(Snapshot),
    /// The remote object (or its container) does not exist. Success for
    /// Read and Delete intents; the record's identity has been cleared.
    Absent,
}

/// Shared reconciliation engine. One instance serves every resource type;
/// each type contributes a [`ResourceDescriptor`] per call.
pub struct Reconciler {
    client: Arc<dyn MutationClient>,
    locks: Arc<LockTable>,
    timeouts: OperationTimeouts,
}

impl Reconciler {
    pub fn new(client: Arc<dyn MutationClient>, locks: Arc<LockTable>) -> Self {
        Self {
            client,
            locks,
            timeouts: OperationTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: OperationTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn locks(&self) -> &Arc<LockTable> {
        &self.locks
    }

    /// Reconcile one resource instance.
    ///
    /// On success the returned state reflects a real fetch of remote truth.
    /// On any error after the mutation step the caller must not assume the
    /// remote system is unchanged; re-reconciling is the recovery mechanism.
    pub async fn reconcile(
        &self,
        descriptor: &ResourceDescriptor,
        raw_id: &str,
        record: &mut DesiredStateRecord,
        intent: Intent,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        // Identifier validation happens before any lock or remote call.
        let id = ResourceIdentifier::parse(raw_id)?;
        let name = id.expect_terminal(descriptor.collection)?.to_string();
        let parent = id.parent().ok_or_else(|| Error::InvalidIdentifier {
            id: raw_id.to_string(),
            reason: format!("a {} has no owning container", descriptor.collection),
        })?;

        let lock_key = if descriptor.lock_parent {
            parent.as_str().to_string()
        } else {
            id.as_str().to_string()
        };

        debug!(
            resource = descriptor.type_name,
            id = %id,
            %intent,
            "admitting reconciliation"
        );
        let _guard = self
            .cancellable(&id, cancel, self.locks.acquire(&lock_key))
            .await?;

        let container = self
            .remote(&id, intent, cancel, self.client.fetch_container(&parent))
            .await?;

        let Some(container) = container else {
            return match intent {
                Intent::CreateOrUpdate => Err(Error::DependencyMissing {
                    id: id.as_str().to_string(),
                    parent: parent.as_str().to_string(),
                }),
                Intent::Read | Intent::Delete => {
                    info!(id = %id, parent = %parent, "container gone, clearing local identity");
                    record.clear_identity();
                    Ok(Outcome::Absent)
                }
            };
        };

        let child_exists = container.has_child(&name);

        match intent {
            Intent::Read => {
                if !child_exists {
                    debug!(id = %id, "child absent on read, clearing local identity");
                    record.clear_identity();
                    return Ok(Outcome::Absent);
                }
                self.read(&id, &parent, &name, record, cancel).await
            }
            Intent::Delete => {
                if !child_exists {
                    // Already deleted; idempotent success.
                    debug!(id = %id, "delete requested but child already absent");
                    record.clear_identity();
                    return Ok(Outcome::Absent);
                }
                let ack = self
                    .remote(&id, intent, cancel, self.client.delete(&parent, &name))
                    .await?;
                let budget = self.timeouts.for_delete();
                self.await_completion(&id, intent, budget, ack, cancel).await?;
                record.clear_identity();
                info!(resource = descriptor.type_name, id = %id, "deleted");
                Ok(Outcome::Absent)
            }
            Intent::CreateOrUpdate => {
                if descriptor.amend_only && !child_exists {
                    // The amended object is itself the dependency.
                    return Err(Error::DependencyMissing {
                        id: id.as_str().to_string(),
                        parent: id.as_str().to_string(),
                    });
                }
                let ack = self
                    .remote(
                        &id,
                        intent,
                        cancel,
                        self.client.create_or_update(&parent, &name, &record.desired),
                    )
                    .await?;
                let budget = self.timeouts.for_create_or_update(child_exists);
                self.await_completion(&id, intent, budget, ack, cancel).await?;

                // Read back from the remote system; the request payload is
                // never treated as the resulting state.
                let snapshot = self
                    .remote(&id, intent, cancel, self.client.get_child(&parent, &name))
                    .await?
                    .ok_or_else(|| Error::ChildNotFoundAfterCreate {
                        id: id.as_str().to_string(),
                    })?;
                record.adopt(&snapshot);
                info!(
                    resource = descriptor.type_name,
                    id = %snapshot.id,
                    created = !child_exists,
                    "converged"
                );
                Ok(Outcome::Converged(snapshot))
            }
        }
    }

    async fn read(
        &self,
        id: &ResourceIdentifier,
        parent: &ResourceIdentifier,
        name: &str,
        record: &mut DesiredStateRecord,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        match self
            .remote(id, Intent::Read, cancel, self.client.get_child(parent, name))
            .await?
        {
            Some(snapshot) => {
                record.adopt(&snapshot);
                Ok(Outcome::Converged(snapshot))
            }
            None => {
                // Deleted out-of-band between listing and fetch, or never
                // present. Absence is success for a read.
                warn!(id = %id, "remote object absent on read, clearing local identity");
                record.clear_identity();
                Ok(Outcome::Absent)
            }
        }
    }

    /// Wait a pending operation to a terminal outcome under `budget`.
    ///
    /// On timeout the outcome is ambiguous: the mutation may still complete
    /// remotely. On cancellation the handle is dropped without aborting the
    /// remote side.
    async fn await_completion(
        &self,
        id: &ResourceIdentifier,
        intent: Intent,
        budget: Duration,
        ack: MutationAck,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let op = match ack {
            MutationAck::Applied => return Ok(()),
            MutationAck::InFlight(op) => op,
        };
        debug!(id = %id, %intent, ?budget, "waiting for pending operation");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled {
                id: id.as_str().to_string(),
            }),
            outcome = tokio::time::timeout(budget, op.wait()) => match outcome {
                Err(_elapsed) => Err(Error::OperationTimedOut {
                    id: id.as_str().to_string(),
                    intent,
                    budget,
                }),
                Ok(Err(source)) => Err(Error::RemoteCall {
                    id: id.as_str().to_string(),
                    intent,
                    source,
                }),
                Ok(Ok(())) => Ok(()),
            },
        }
    }

    /// Run a remote fetch/mutation, wrapping its error with identifier and
    /// intent context and observing cancellation.
    async fn remote<T>(
        &self,
        id: &ResourceIdentifier,
        intent: Intent,
        cancel: &CancellationToken,
        call: impl Future<Output = crate::client::RemoteResult<T>>,
    ) -> Result<T> {
        let res = self.cancellable(id, cancel, call).await?;
        res.map_err(|source| Error::RemoteCall {
            id: id.as_str().to_string(),
            intent,
            source,
        })
    }

    /// Race a suspension point against the caller's cancellation signal.
    /// Biased toward cancellation so an already-cancelled token wins
    /// deterministically.
    async fn cancellable<T>(
        &self,
        id: &ResourceIdentifier,
        cancel: &CancellationToken,
        fut: impl Future<Output = T>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled {
                id: id.as_str().to_string(),
            }),
            value = fut => Ok(value),
        }
    }
}
