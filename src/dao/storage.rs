//! Storage errors shared by every backend.

use std::error::Error;
use thiserror::Error;
use uuid::Uuid;

use crate::state::game::VersionToken;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No game is stored under `id`.
    #[error("game {id} not found")]
    NotFound {
        /// Requested game.
        id: Uuid,
    },
    /// An insert reused the id of a stored game.
    #[error("game {id} already exists")]
    AlreadyExists {
        /// Id of the stored game.
        id: Uuid,
    },
    /// An insert carried an entry code another game already holds.
    #[error("entry code {code} is already in use")]
    EntryCodeTaken {
        /// Code that is held.
        code: String,
    },
    /// The stored version no longer matches `expected`.
    #[error("game {id} was modified since version {expected}")]
    VersionConflict {
        /// Game written.
        id: Uuid,
        /// Version the write was based on.
        expected: VersionToken,
    },
    /// The backend could not be reached or answered with an error.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What failed.
        message: String,
        /// Underlying error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Whether the write lost an optimistic concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::VersionConflict { .. } | StorageError::AlreadyExists { .. }
        )
    }
}
