//! Error types for the store and the resource handlers.
//!
//! # Design
//! `NotFound` and `BadRequest` are distinct variants because the HTTP layer
//! maps them to different statuses. Store failures pass through untouched and
//! surface as internal errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a [`Collection`](crate::store::Collection).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write snapshot {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {path} is not a valid document array: {source}")]
    SnapshotDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot {path}: {source}")]
    SnapshotEncode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot {path} holds a document without a valid _id")]
    SnapshotMissingId { path: PathBuf },

    /// An array operator targeted a field holding something other than an array.
    #[error("field `{field}` of {collection} document {id} is not an array")]
    NotAnArray {
        collection: String,
        id: String,
        field: String,
    },
}

/// Errors returned by the todo and tag handlers.
#[derive(Debug, Error)]
pub enum Error {
    /// The identifier was malformed or no document matched it.
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// The request payload is missing a required field or carries a
    /// malformed one.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            resource,
            id: id.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
