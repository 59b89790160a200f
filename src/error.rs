//! Service and HTTP error types.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::storage::StorageError,
    state::state_machine::{ActionParseError, InvalidTransition},
};

/// Message returned to clients whose version token is stale.
pub const VERSION_CONFLICT_MESSAGE: &str =
    "Unable to save game - version conflict. Please pull the latest version and reapply your changes.";

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A team, player, treasure or persisted game referenced by a write does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A read targeted a game that does not exist.
    #[error("game {0} not found")]
    GameNotFound(Uuid),
    /// No game carries the requested entry code.
    #[error("no game with entry code {0}")]
    EntryCodeNotFound(String),
    /// The write lost an optimistic concurrency race.
    #[error("{0}")]
    Conflict(String),
}

impl ServiceError {
    /// Conflict carrying the refetch instruction.
    pub fn version_conflict() -> Self {
        ServiceError::Conflict(VERSION_CONFLICT_MESSAGE.to_string())
    }

    /// Whether this error is a concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::VersionConflict { .. } => ServiceError::version_conflict(),
            StorageError::AlreadyExists { id } => {
                ServiceError::Conflict(format!("game {id} already exists"))
            }
            StorageError::NotFound { id } => ServiceError::NotFound(format!("game {id}")),
            err @ StorageError::EntryCodeTaken { .. } => {
                ServiceError::InvalidState(err.to_string())
            }
            err @ StorageError::Unavailable { .. } => ServiceError::Unavailable(err),
        }
    }
}

impl From<ActionParseError> for ServiceError {
    fn from(err: ActionParseError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected request; the message carries the underlying failure.
    #[error("{0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Stale version token.
    #[error("{0}")]
    Conflict(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Conflict(message) => AppError::Conflict(message),
            err @ (ServiceError::GameNotFound(_) | ServiceError::EntryCodeNotFound(_)) => {
                AppError::NotFound(err.to_string())
            }
            err => AppError::BadRequest(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
