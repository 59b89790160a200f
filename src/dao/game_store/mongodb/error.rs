//! Error types of the MongoDB storage implementation.

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY: i32 = 11000;

/// Failures talking to MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required variable is unset.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The connection URI did not parse.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// URI as configured.
        uri: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// The server never answered during startup.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried.
        attempts: u32,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A periodic health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// Index creation failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection indexed.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A game write failed.
    #[error("failed to save game `{id}`")]
    SaveGame {
        /// Game written.
        id: Uuid,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A game read failed.
    #[error("failed to load game `{id}`")]
    LoadGame {
        /// Game read.
        id: Uuid,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// An entry-code query failed.
    #[error("failed to look up game by entry code")]
    LookupEntryCode {
        /// Underlying error.
        #[source]
        source: MongoError,
    },
}

/// Whether a write failed on a unique index, `_id` included.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

/// Whether a write failed on the unique index named `index`.
pub fn is_duplicate_key_on(err: &MongoError, index: &str) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY && write_error.message.contains(index)
    )
}
