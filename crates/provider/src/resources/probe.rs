//! Load balancer health probe

use serde_json::{json, Value};

use nimbus_common::{DesiredStateRecord, ResourceIdentifier};
use nimbus_reconciler::ResourceDescriptor;

use crate::error::{Error, Result};
use crate::state::{
    get_int_attr, get_string_attr, int_value, make_state, require_int_attr, require_string_attr,
    string_value,
};
use super::Resource;

/// Health probe attached to a load balancer.
///
/// Configuration shape: `name`, `loadbalancer_id`, `port` (required),
/// `protocol` (default `Tcp`), `request_path` (HTTP probes only),
/// `interval_in_seconds` (default 15), `number_of_probes` (default 2).
pub struct ProbeResource;

impl Resource for ProbeResource {
    fn type_name() -> &'static str {
        "nimbus_lb_probe"
    }

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor {
            type_name: Self::type_name(),
            collection: "probes",
            lock_parent: true,
            amend_only: false,
        }
    }

    fn parent_id(config: &Value) -> Result<String> {
        require_string_attr(config, "loadbalancer_id")
    }

    fn expand(config: &Value) -> Result<Value> {
        let protocol = match config.get("protocol").and_then(Value::as_str) {
            None | Some("") => "Tcp".to_string(),
            Some(p) => p.to_string(),
        };

        let mut properties = json!({
            "protocol": protocol,
            "port": require_int_attr(config, "port")?,
            "intervalInSeconds": get_int_attr(config, "interval_in_seconds", 15),
            "numberOfProbes": get_int_attr(config, "number_of_probes", 2),
        });
        let request_path = get_string_attr(config, "request_path");
        if !request_path.is_empty() {
            properties["requestPath"] = Value::String(request_path);
        }
        Ok(properties)
    }

    fn flatten(record: &DesiredStateRecord) -> Result<Value> {
        let raw_id = record.id.as_deref().ok_or(Error::MissingAttribute("id"))?;
        let id = ResourceIdentifier::parse(raw_id)?;
        let parent = id.parent().ok_or_else(|| nimbus_common::Error::InvalidIdentifier {
            id: raw_id.to_string(),
            reason: "a probe has no owning load balancer".to_string(),
        })?;
        let properties = record.observed.as_ref().cloned().unwrap_or(Value::Null);

        Ok(make_state(vec![
            ("id", string_value(raw_id)),
            ("name", string_value(&record.name)),
            ("loadbalancer_id", string_value(parent.as_str())),
            ("protocol", string_value(get_string_attr(&properties, "protocol"))),
            ("port", int_value(get_int_attr(&properties, "port", 0))),
            ("request_path", string_value(get_string_attr(&properties, "requestPath"))),
            (
                "interval_in_seconds",
                int_value(get_int_attr(&properties, "intervalInSeconds", 15)),
            ),
            (
                "number_of_probes",
                int_value(get_int_attr(&properties, "numberOfProbes", 2)),
            ),
        ]))
    }
}
