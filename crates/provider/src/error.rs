//! Error types for the resource handlers

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required attribute {0:?}")]
    MissingAttribute(&'static str),

    #[error("attribute {key:?} must be {expected}")]
    WrongAttributeType {
        key: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    Reconcile(#[from] nimbus_common::Error),

    /// A data-source lookup found nothing at the requested path. Unlike a
    /// state refresh, a lookup has no state to drop; absence is an error.
    #[error("no resource found at {id}")]
    NotFound { id: String },

    #[error("timeout waiting on reattach config")]
    ReattachTimeout,

    #[error("plugin server exited before sending a reattach config")]
    ReattachDropped,
}
