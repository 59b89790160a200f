//! Outbound collaborators invoked after a game write commits.

mod events;
mod push;
mod scheduler;

use thiserror::Error;

pub use events::{EventSink, HttpEventSink, TracingEventSink};
pub use push::{HttpPushTransport, LogPushTransport, PushPayload, PushTransport};
pub use scheduler::{EndGameScheduler, EndGameTrigger, LocalEndGameScheduler, WebhookEndGameScheduler};

/// Failure of an outbound call. Never rolls back the write that triggered it.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request could not be sent.
    #[error("request to `{endpoint}` failed")]
    Request {
        /// Target URL.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-success status.
    #[error("`{endpoint}` answered with status {status}")]
    Status {
        /// Target URL.
        endpoint: String,
        /// Status received.
        status: reqwest::StatusCode,
    },
    /// The in-process end-game worker stopped.
    #[error("end-game worker is gone")]
    WorkerClosed,
}

/// Result of an outbound call.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Post `body` as JSON and require a success status.
async fn post_json<T>(
    request: reqwest::RequestBuilder,
    endpoint: &str,
    body: &T,
) -> DispatchResult<()>
where
    T: ?Sized + serde::Serialize,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|source| DispatchError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(DispatchError::Status {
            endpoint: endpoint.to_string(),
            status: response.status(),
        })
    }
}
