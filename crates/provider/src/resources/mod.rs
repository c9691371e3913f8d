//! Resource type implementations
//!
//! One module per remote resource type. A type only supplies its descriptor
//! and the expand/flatten mapping between flat configuration attributes and
//! the remote property bag; the provided CRUD methods drive the shared
//! reconciliation engine.

pub mod backend_pool;
pub mod pool_addresses;
pub mod probe;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use nimbus_common::{DesiredStateRecord, Intent, ResourceIdentifier};
use nimbus_reconciler::{Outcome, Reconciler, ResourceDescriptor};

use crate::error::{Error, Result};
use crate::state::require_string_attr;

/// A child resource type living under an owning container.
#[async_trait]
pub trait Resource {
    /// Configuration-facing type name.
    fn type_name() -> &'static str;

    /// Where this type sits in the identifier hierarchy and how it locks.
    fn descriptor() -> ResourceDescriptor;

    /// Identifier of the owning container, read from configuration.
    fn parent_id(config: &Value) -> Result<String>;

    /// Name of the child entity, read from configuration. Most types call
    /// the attribute `name`; override when the schema spells it differently.
    fn child_name(config: &Value) -> Result<String> {
        require_string_attr(config, "name")
    }

    /// Desired property bag for the remote call. Always the complete set;
    /// mutations are full replaces.
    fn expand(config: &Value) -> Result<Value>;

    /// Flat attribute map written back from a converged record.
    fn flatten(record: &DesiredStateRecord) -> Result<Value>;

    /// Create the resource, or fully replace its mutable fields if it
    /// already exists. Returns the post-mutation state as read back from
    /// the remote system.
    async fn create_or_update(
        engine: &Reconciler,
        config: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let descriptor = Self::descriptor();
        let name = Self::child_name(config)?;
        let parent = ResourceIdentifier::parse(&Self::parent_id(config)?)?;
        let id = parent.child(descriptor.collection, &name)?;
        debug!(resource = Self::type_name(), id = %id, "create_or_update");

        let mut record = DesiredStateRecord::new(&name, Self::expand(config)?);
        engine
            .reconcile(&descriptor, id.as_str(), &mut record, Intent::CreateOrUpdate, cancel)
            .await?;
        Self::flatten(&record)
    }

    /// Refresh state from the remote system. `None` means the resource (or
    /// its container) no longer exists and must be dropped from state.
    async fn read(
        engine: &Reconciler,
        state: &Value,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        let descriptor = Self::descriptor();
        let raw_id = require_string_attr(state, "id")?;
        let id = ResourceIdentifier::parse(&raw_id)?;

        let mut record = DesiredStateRecord::new(id.name(), Value::Null);
        match engine
            .reconcile(&descriptor, &raw_id, &mut record, Intent::Read, cancel)
            .await?
        {
            Outcome::Converged(_) => Ok(Some(Self::flatten(&record)?)),
            Outcome::Absent => Ok(None),
        }
    }

    /// Look the resource up by owning container and name, data-source
    /// style. There is no stored identifier going in; the returned state's
    /// id comes from the remote read. Unlike [`Resource::read`], absence of
    /// the container or the child is an error, not an empty result.
    async fn lookup(
        engine: &Reconciler,
        config: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let descriptor = Self::descriptor();
        let name = Self::child_name(config)?;
        let parent = ResourceIdentifier::parse(&Self::parent_id(config)?)?;
        let id = parent.child(descriptor.collection, &name)?;
        debug!(resource = Self::type_name(), id = %id, "lookup");

        let mut record = DesiredStateRecord::new(&name, Value::Null);
        match engine
            .reconcile(&descriptor, id.as_str(), &mut record, Intent::Read, cancel)
            .await?
        {
            Outcome::Converged(_) => Self::flatten(&record),
            Outcome::Absent => Err(Error::NotFound {
                id: id.as_str().to_string(),
            }),
        }
    }

    /// Delete the resource. Succeeds when it is already absent.
    async fn delete(engine: &Reconciler, state: &Value, cancel: &CancellationToken) -> Result<()> {
        let descriptor = Self::descriptor();
        let raw_id = require_string_attr(state, "id")?;
        let id = ResourceIdentifier::parse(&raw_id)?;
        debug!(resource = Self::type_name(), id = %id, "delete");

        let mut record = DesiredStateRecord::new(id.name(), Value::Null);
        engine
            .reconcile(&descriptor, &raw_id, &mut record, Intent::Delete, cancel)
            .await?;
        Ok(())
    }
}
