//! Error types shared by the CouchDB storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures talking to CouchDB. `path` is relative to the server root.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// A required variable is unset.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The request never got an answer.
    #[error("CouchDB request to `{path}` failed")]
    Send {
        /// Request path.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected status.
    #[error("CouchDB answered `{path}` with status {status}")]
    Status {
        /// Request path.
        path: String,
        /// Status received.
        status: StatusCode,
    },
    /// Stale `_rev`, or a create for an id that is already taken.
    #[error("CouchDB revision conflict on `{path}`")]
    Conflict {
        /// Request path.
        path: String,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode CouchDB response for `{path}`")]
    Decode {
        /// Request path.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB never returns a stored document without one.
    #[error("CouchDB document `{path}` has no revision")]
    MissingRevision {
        /// Document path.
        path: String,
    },
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
