//! Core reconciliation types

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the caller wants done with the resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateOrUpdate,
    Read,
    Delete,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::CreateOrUpdate => write!(f, "create_or_update"),
            Intent::Read => write!(f, "read"),
            Intent::Delete => write!(f, "delete"),
        }
    }
}

/// Remote truth for one child object, as returned by the remote API.
///
/// Fetched fresh on every reconciliation pass and never cached across passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Remote-assigned identifier path.
    pub id: String,
    pub name: String,
    /// Remote-reported provisioning state, when the API exposes one.
    pub provisioning_state: Option<String>,
    /// Full property bag as the remote system stores it, including any
    /// server-side normalization or defaulting.
    pub properties: serde_json::Value,
}

/// Existence and child listing for an owning container.
///
/// Only used to decide the reconciliation branch; authoritative child
/// properties always come from a dedicated fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub id: String,
    pub child_names: Vec<String>,
}

impl ContainerSnapshot {
    /// The remote system treats child names case-insensitively when listing.
    pub fn has_child(&self, name: &str) -> bool {
        self.child_names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

/// The configuration record the caller wants to exist for one resource
/// instance. Owned exclusively by the reconciliation that is processing it;
/// the per-identifier lock keeps concurrent invocations off the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredStateRecord {
    /// Terminal name segment of the resource.
    pub name: String,
    /// Complete desired property set. Mutations always send all of it; the
    /// remote call is a full replace, never a partial patch.
    pub desired: serde_json::Value,
    /// Remote-assigned identity, populated only from an authoritative
    /// read-back. `None` means "not known to exist".
    pub id: Option<String>,
    /// Properties observed on the last successful read-back.
    pub observed: Option<serde_json::Value>,
}

impl DesiredStateRecord {
    pub fn new(name: impl Into<String>, desired: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            desired,
            id: None,
            observed: None,
        }
    }

    /// Record that the remote object does not exist.
    pub fn clear_identity(&mut self) {
        self.id = None;
        self.observed = None;
    }

    /// Populate identity and computed fields from an authoritative read.
    /// Never called with values derived from a request payload.
    pub fn adopt(&mut self, snapshot: &Snapshot) {
        self.id = Some(snapshot.id.clone());
        self.observed = Some(snapshot.properties.clone());
    }
}
