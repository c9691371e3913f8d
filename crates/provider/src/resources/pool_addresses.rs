//! Backend address pool address association
//!
//! Manages the address set of a pool that some other configuration owns.
//! The pool itself must already exist; this type only replaces its
//! `loadBalancerBackendAddresses` and never creates or removes the pool.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use nimbus_common::{DesiredStateRecord, Intent, ResourceIdentifier};
use nimbus_reconciler::{Reconciler, ResourceDescriptor};

use crate::error::{Error, Result};
use crate::state::{get_block_list, list_value, make_state, require_string_attr, string_value};
use super::backend_pool::{expand_addresses, flatten_addresses};
use super::Resource;

/// Address set attached to an existing backend address pool.
///
/// Configuration shape:
/// - `loadbalancer_id`
/// - `backend_address_pool_name`
/// - `backend_ip_addresses` blocks: `name`, `virtual_network_id`, `ip_address`
pub struct BackendPoolAddressesResource;

#[async_trait]
impl Resource for BackendPoolAddressesResource {
    fn type_name() -> &'static str {
        "nimbus_lb_backend_address_pool_addresses"
    }

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor {
            type_name: Self::type_name(),
            collection: "backendAddressPools",
            lock_parent: true,
            amend_only: true,
        }
    }

    fn parent_id(config: &Value) -> Result<String> {
        require_string_attr(config, "loadbalancer_id")
    }

    fn child_name(config: &Value) -> Result<String> {
        require_string_attr(config, "backend_address_pool_name")
    }

    fn expand(config: &Value) -> Result<Value> {
        let addresses = expand_addresses(&get_block_list(config, "backend_ip_addresses"))?;
        Ok(json!({ "loadBalancerBackendAddresses": addresses }))
    }

    fn flatten(record: &DesiredStateRecord) -> Result<Value> {
        let raw_id = record.id.as_deref().ok_or(Error::MissingAttribute("id"))?;
        let id = ResourceIdentifier::parse(raw_id)?;
        let parent = id.parent().ok_or_else(|| nimbus_common::Error::InvalidIdentifier {
            id: raw_id.to_string(),
            reason: "a backend address pool has no owning load balancer".to_string(),
        })?;
        let properties = record.observed.as_ref().cloned().unwrap_or(Value::Null);

        Ok(make_state(vec![
            ("id", string_value(raw_id)),
            ("loadbalancer_id", string_value(parent.as_str())),
            ("backend_address_pool_name", string_value(&record.name)),
            ("backend_ip_addresses", list_value(flatten_addresses(&properties))),
        ]))
    }

    /// Releasing the association empties the pool's address set. The pool
    /// itself is owned by its own resource and stays in place; a pool (or
    /// load balancer) that is already gone counts as released.
    async fn delete(engine: &Reconciler, state: &Value, cancel: &CancellationToken) -> Result<()> {
        let descriptor = Self::descriptor();
        let raw_id = require_string_attr(state, "id")?;
        let id = ResourceIdentifier::parse(&raw_id)?;
        debug!(resource = Self::type_name(), id = %id, "releasing address set");

        let mut record = DesiredStateRecord::new(
            id.name(),
            json!({ "loadBalancerBackendAddresses": [] }),
        );
        match engine
            .reconcile(&descriptor, &raw_id, &mut record, Intent::CreateOrUpdate, cancel)
            .await
        {
            Ok(_) => Ok(()),
            Err(nimbus_common::Error::DependencyMissing { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
