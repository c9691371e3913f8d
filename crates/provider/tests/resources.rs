//! Resource handler lifecycle tests against an in-memory remote API.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use nimbus_common::error::RemoteError;
use nimbus_common::{ContainerSnapshot, ResourceIdentifier, Snapshot};
use nimbus_provider::resources::backend_pool::BackendAddressPoolResource;
use nimbus_provider::resources::pool_addresses::BackendPoolAddressesResource;
use nimbus_provider::resources::probe::ProbeResource;
use nimbus_provider::resources::Resource;
use nimbus_reconciler::{LockTable, MutationAck, MutationClient, Reconciler};

const LB: &str = "/subscriptions/s1/resourceGroups/rg/providers/Nimbus.Network/loadBalancers/lb1";
const VNET: &str =
    "/subscriptions/s1/resourceGroups/rg/providers/Nimbus.Network/virtualNetworks/vnet1";

/// Minimal remote API for one child collection: containers hold child
/// property bags keyed by name, every mutation applies synchronously.
/// The collection segment is baked in the way a per-resource-type SDK
/// client bakes in its endpoint path.
struct InMemoryApi {
    collection: &'static str,
    containers: Mutex<HashMap<String, HashMap<String, Value>>>,
}

impl InMemoryApi {
    fn new(collection: &'static str) -> Self {
        Self {
            collection,
            containers: Mutex::new(HashMap::new()),
        }
    }

    fn with_container(self, id: &str) -> Self {
        self.containers.lock().insert(id.to_string(), HashMap::new());
        self
    }
}

#[async_trait]
impl MutationClient for InMemoryApi {
    async fn fetch_container(
        &self,
        parent: &ResourceIdentifier,
    ) -> Result<Option<ContainerSnapshot>, RemoteError> {
        Ok(self.containers.lock().get(parent.as_str()).map(|children| {
            ContainerSnapshot {
                id: parent.as_str().to_string(),
                child_names: children.keys().cloned().collect(),
            }
        }))
    }

    async fn get_child(
        &self,
        parent: &ResourceIdentifier,
        name: &str,
    ) -> Result<Option<Snapshot>, RemoteError> {
        Ok(self
            .containers
            .lock()
            .get(parent.as_str())
            .and_then(|children| children.get(name))
            .map(|properties| Snapshot {
                id: format!("{}/{}/{}", parent.as_str(), self.collection, name),
                name: name.to_string(),
                provisioning_state: Some("Succeeded".to_string()),
                properties: properties.clone(),
            }))
    }

    async fn create_or_update(
        &self,
        parent: &ResourceIdentifier,
        name: &str,
        properties: &Value,
    ) -> Result<MutationAck, RemoteError> {
        let mut containers = self.containers.lock();
        let children = containers
            .get_mut(parent.as_str())
            .ok_or("container does not exist")?;
        children.insert(name.to_string(), properties.clone());
        Ok(MutationAck::Applied)
    }

    async fn delete(
        &self,
        parent: &ResourceIdentifier,
        name: &str,
    ) -> Result<MutationAck, RemoteError> {
        if let Some(children) = self.containers.lock().get_mut(parent.as_str()) {
            children.remove(name);
        }
        Ok(MutationAck::Applied)
    }
}

fn engine(api: Arc<InMemoryApi>) -> Reconciler {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Reconciler::new(api, Arc::new(LockTable::new()))
}

#[tokio::test]
async fn backend_pool_full_lifecycle() {
    let api = Arc::new(InMemoryApi::new("backendAddressPools").with_container(LB));
    let engine = engine(Arc::clone(&api));
    let cancel = CancellationToken::new();

    let config = json!({
        "name": "pool1",
        "loadbalancer_id": LB,
        "ip_address": [
            {"name": "a1", "virtual_network_id": VNET, "ip_address": "10.0.0.4"},
        ],
    });

    let state = BackendAddressPoolResource::create_or_update(&engine, &config, &cancel)
        .await
        .unwrap();
    assert_eq!(state["name"], "pool1");
    assert_eq!(state["loadbalancer_id"], LB);
    assert_eq!(state["ip_address"][0]["ip_address"], "10.0.0.4");
    let id = state["id"].as_str().unwrap().to_string();
    assert!(id.starts_with(LB));

    let refreshed = BackendAddressPoolResource::read(&engine, &state, &cancel)
        .await
        .unwrap()
        .expect("pool should exist after create");
    assert_eq!(refreshed["ip_address"], state["ip_address"]);

    BackendAddressPoolResource::delete(&engine, &state, &cancel)
        .await
        .unwrap();
    let gone = BackendAddressPoolResource::read(&engine, &state, &cancel)
        .await
        .unwrap();
    assert!(gone.is_none());

    // Deleting again is still a success.
    BackendAddressPoolResource::delete(&engine, &state, &cancel)
        .await
        .unwrap();
}

#[tokio::test]
async fn update_replaces_the_full_address_set() {
    let api = Arc::new(InMemoryApi::new("backendAddressPools").with_container(LB));
    let engine = engine(Arc::clone(&api));
    let cancel = CancellationToken::new();

    let initial = json!({
        "name": "pool1",
        "loadbalancer_id": LB,
        "ip_address": [
            {"name": "a1", "virtual_network_id": VNET, "ip_address": "10.0.0.4"},
            {"name": "a2", "virtual_network_id": VNET, "ip_address": "10.0.0.5"},
        ],
    });
    BackendAddressPoolResource::create_or_update(&engine, &initial, &cancel)
        .await
        .unwrap();

    let replacement = json!({
        "name": "pool1",
        "loadbalancer_id": LB,
        "ip_address": [
            {"name": "a3", "virtual_network_id": VNET, "ip_address": "10.0.0.6"},
        ],
    });
    let state = BackendAddressPoolResource::create_or_update(&engine, &replacement, &cancel)
        .await
        .unwrap();

    // Full replace, not a merge.
    let blocks = state["ip_address"].as_array().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0]["name"], "a3");
}

#[tokio::test]
async fn read_after_container_vanishes_reports_absence() {
    let api = Arc::new(InMemoryApi::new("probes").with_container(LB));
    let engine = engine(Arc::clone(&api));
    let cancel = CancellationToken::new();

    let config = json!({
        "name": "probe1",
        "loadbalancer_id": LB,
        "port": 443,
    });
    let state = ProbeResource::create_or_update(&engine, &config, &cancel)
        .await
        .unwrap();
    assert_eq!(state["protocol"], "Tcp");

    // The whole load balancer is deleted out-of-band.
    api.containers.lock().remove(LB);

    let refreshed = ProbeResource::read(&engine, &state, &cancel).await.unwrap();
    assert!(refreshed.is_none());
}

#[tokio::test]
async fn lookup_assigns_id_from_the_remote_read() {
    let api = Arc::new(InMemoryApi::new("backendAddressPools").with_container(LB));
    let engine = engine(Arc::clone(&api));
    let cancel = CancellationToken::new();

    let config = json!({
        "name": "pool1",
        "loadbalancer_id": LB,
        "ip_address": [
            {"name": "a1", "virtual_network_id": VNET, "ip_address": "10.0.0.4"},
        ],
    });
    let created = BackendAddressPoolResource::create_or_update(&engine, &config, &cancel)
        .await
        .unwrap();

    // Lookup goes in with only the container id and the name.
    let query = json!({"name": "pool1", "loadbalancer_id": LB});
    let found = BackendAddressPoolResource::lookup(&engine, &query, &cancel)
        .await
        .unwrap();
    assert_eq!(found["id"], created["id"]);
    assert_eq!(found["ip_address"][0]["ip_address"], "10.0.0.4");
}

#[tokio::test]
async fn lookup_of_a_missing_load_balancer_is_an_error() {
    let api = Arc::new(InMemoryApi::new("backendAddressPools"));
    let engine = engine(Arc::clone(&api));

    let query = json!({"name": "pool1", "loadbalancer_id": LB});
    let err = BackendAddressPoolResource::lookup(&engine, &query, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, nimbus_provider::Error::NotFound { .. }));
}

#[tokio::test]
async fn lookup_of_a_missing_pool_is_an_error() {
    let api = Arc::new(InMemoryApi::new("backendAddressPools").with_container(LB));
    let engine = engine(Arc::clone(&api));

    let query = json!({"name": "no-such-pool", "loadbalancer_id": LB});
    let err = BackendAddressPoolResource::lookup(&engine, &query, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, nimbus_provider::Error::NotFound { .. }));
}

#[tokio::test]
async fn pool_addresses_amend_an_existing_pool() {
    let api = Arc::new(InMemoryApi::new("backendAddressPools").with_container(LB));
    let engine = engine(Arc::clone(&api));
    let cancel = CancellationToken::new();

    let pool = json!({
        "name": "pool1",
        "loadbalancer_id": LB,
        "ip_address": [
            {"name": "a1", "virtual_network_id": VNET, "ip_address": "10.0.0.4"},
        ],
    });
    BackendAddressPoolResource::create_or_update(&engine, &pool, &cancel)
        .await
        .unwrap();

    let association = json!({
        "loadbalancer_id": LB,
        "backend_address_pool_name": "pool1",
        "backend_ip_addresses": [
            {"name": "b1", "virtual_network_id": VNET, "ip_address": "10.0.0.8"},
            {"name": "b2", "virtual_network_id": VNET, "ip_address": "10.0.0.9"},
        ],
    });
    let state = BackendPoolAddressesResource::create_or_update(&engine, &association, &cancel)
        .await
        .unwrap();
    let blocks = state["backend_ip_addresses"].as_array().unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["name"], "b1");

    // Releasing the association empties the set but keeps the pool.
    BackendPoolAddressesResource::delete(&engine, &state, &cancel)
        .await
        .unwrap();
    let pool_state = BackendAddressPoolResource::read(&engine, &state, &cancel)
        .await
        .unwrap()
        .expect("pool must survive the association release");
    assert_eq!(pool_state["ip_address"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn pool_addresses_require_an_existing_pool() {
    let api = Arc::new(InMemoryApi::new("backendAddressPools").with_container(LB));
    let engine = engine(Arc::clone(&api));

    let association = json!({
        "loadbalancer_id": LB,
        "backend_address_pool_name": "absent",
        "backend_ip_addresses": [
            {"name": "b1", "virtual_network_id": VNET, "ip_address": "10.0.0.8"},
        ],
    });
    let err =
        BackendPoolAddressesResource::create_or_update(&engine, &association, &CancellationToken::new())
            .await
            .unwrap_err();
    assert!(matches!(
        err,
        nimbus_provider::Error::Reconcile(nimbus_common::Error::DependencyMissing { .. })
    ));
}

#[tokio::test]
async fn create_requires_an_existing_load_balancer() {
    let api = Arc::new(InMemoryApi::new("probes"));
    let engine = engine(Arc::clone(&api));

    let config = json!({
        "name": "probe1",
        "loadbalancer_id": LB,
        "port": 443,
    });
    let err = ProbeResource::create_or_update(&engine, &config, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        nimbus_provider::Error::Reconcile(nimbus_common::Error::DependencyMissing { .. })
    ));
}
