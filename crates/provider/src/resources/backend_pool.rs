//! Load balancer backend address pool

use serde_json::{json, Value};

use nimbus_common::{DesiredStateRecord, ResourceIdentifier};
use nimbus_reconciler::ResourceDescriptor;

use crate::error::{Error, Result};
use crate::state::{
    get_block_list, get_string_attr, list_value, make_state, require_string_attr, string_value,
};
use super::Resource;

/// Expand flat address blocks into the remote `loadBalancerBackendAddresses`
/// entries. Shared with the pool-addresses association type, which writes the
/// same wire shape.
pub(super) fn expand_addresses(blocks: &[&Value]) -> Result<Vec<Value>> {
    let mut addresses = Vec::new();
    for block in blocks {
        addresses.push(json!({
            "name": require_string_attr(block, "name")?,
            "properties": {
                "virtualNetwork": {
                    "id": require_string_attr(block, "virtual_network_id")?,
                },
                "ipAddress": require_string_attr(block, "ip_address")?,
            },
        }));
    }
    Ok(addresses)
}

/// Inverse of [`expand_addresses`], reading a pool property bag.
pub(super) fn flatten_addresses(properties: &Value) -> Vec<Value> {
    properties
        .get("loadBalancerBackendAddresses")
        .and_then(Value::as_array)
        .map(|addresses| {
            addresses
                .iter()
                .map(|address| {
                    let props = address.get("properties").cloned().unwrap_or(Value::Null);
                    make_state(vec![
                        ("name", string_value(get_string_attr(address, "name"))),
                        (
                            "virtual_network_id",
                            string_value(
                                props
                                    .get("virtualNetwork")
                                    .map(|vnet| get_string_attr(vnet, "id"))
                                    .unwrap_or_default(),
                            ),
                        ),
                        ("ip_address", string_value(get_string_attr(&props, "ipAddress"))),
                    ])
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Pool of backend IP addresses attached to a load balancer.
///
/// Configuration shape:
/// - `name`
/// - `loadbalancer_id`
/// - `ip_address` blocks: `name`, `virtual_network_id`, `ip_address`
///
/// Pools are stored inside the load balancer's remote representation, so
/// mutations serialize on the owning load balancer.
pub struct BackendAddressPoolResource;

impl Resource for BackendAddressPoolResource {
    fn type_name() -> &'static str {
        "nimbus_lb_backend_address_pool"
    }

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor {
            type_name: Self::type_name(),
            collection: "backendAddressPools",
            lock_parent: true,
            amend_only: false,
        }
    }

    fn parent_id(config: &Value) -> Result<String> {
        require_string_attr(config, "loadbalancer_id")
    }

    fn expand(config: &Value) -> Result<Value> {
        let addresses = expand_addresses(&get_block_list(config, "ip_address"))?;
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
        let ip_addresses = flatten_addresses(&properties);

        Ok(make_state(vec![
            ("id", string_value(raw_id)),
            ("name", string_value(&record.name)),
            ("loadbalancer_id", string_value(parent.as_str())),
            ("ip_address", list_value(ip_addresses)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LB: &str =
        "/subscriptions/s1/resourceGroups/rg/providers/Nimbus.Network/loadBalancers/lb1";

    #[test]
    fn expand_builds_the_remote_address_shape() {
        let config = json!({
            "name": "pool1",
            "loadbalancer_id": LB,
            "ip_address": [
                {"name": "a1", "virtual_network_id": "/subscriptions/s1/resourceGroups/rg/providers/Nimbus.Network/virtualNetworks/vnet1", "ip_address": "10.0.0.4"},
                {"name": "a2", "virtual_network_id": "/subscriptions/s1/resourceGroups/rg/providers/Nimbus.Network/virtualNetworks/vnet1", "ip_address": "10.0.0.5"},
            ],
        });

        let properties = BackendAddressPoolResource::expand(&config).unwrap();
        let addresses = properties["loadBalancerBackendAddresses"].as_array().unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0]["name"], "a1");
        assert_eq!(addresses[0]["properties"]["ipAddress"], "10.0.0.4");
        assert_eq!(
            addresses[1]["properties"]["virtualNetwork"]["id"],
            "/subscriptions/s1/resourceGroups/rg/providers/Nimbus.Network/virtualNetworks/vnet1"
        );
    }

    #[test]
    fn expand_rejects_incomplete_blocks() {
        let config = json!({
            "ip_address": [{"name": "a1", "ip_address": "10.0.0.4"}],
        });
        assert!(matches!(
            BackendAddressPoolResource::expand(&config),
            Err(Error::MissingAttribute("virtual_network_id"))
        ));
    }

    #[test]
    fn flatten_round_trips_the_observed_properties() {
        let mut record = DesiredStateRecord::new("pool1", Value::Null);
        record.id = Some(format!("{}/backendAddressPools/pool1", LB));
        record.observed = Some(json!({
            "loadBalancerBackendAddresses": [
                {"name": "a1", "properties": {"virtualNetwork": {"id": "/subscriptions/s1/resourceGroups/rg/providers/Nimbus.Network/virtualNetworks/vnet1"}, "ipAddress": "10.0.0.4"}},
            ],
        }));

        let state = BackendAddressPoolResource::flatten(&record).unwrap();
        assert_eq!(state["loadbalancer_id"], LB);
        assert_eq!(state["name"], "pool1");
        let blocks = state["ip_address"].as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["ip_address"], "10.0.0.4");
        assert_eq!(blocks[0]["name"], "a1");
    }

    #[test]
    fn flatten_without_identity_is_an_error() {
        let record = DesiredStateRecord::new("pool1", Value::Null);
        assert!(BackendAddressPoolResource::flatten(&record).is_err());
    }
}
