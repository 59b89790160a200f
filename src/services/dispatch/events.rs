//! Analytics event sinks.

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::info;

use super::{DispatchResult, post_json};
use crate::services::audit_events::AuditEvent;

/// Best-effort analytics sink.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn emit(&self, event: AuditEvent) -> BoxFuture<'static, DispatchResult<()>>;
}

/// Writes events to the `audit` tracing target.
#[derive(Debug, Clone, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: AuditEvent) -> BoxFuture<'static, DispatchResult<()>> {
        info!(
            target: "audit",
            name = %event.name,
            game_id = ?event.game_id,
            player_id = ?event.player_id,
            attributes = ?event.attributes,
            "audit event"
        );
        Box::pin(async { Ok(()) })
    }
}

/// Forwards events as JSON to a collector and mirrors them to the log.
#[derive(Clone)]
pub struct HttpEventSink {
    client: Client,
    endpoint: String,
}

impl HttpEventSink {
    /// Sink posting to `endpoint`.
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

impl EventSink for HttpEventSink {
    fn emit(&self, event: AuditEvent) -> BoxFuture<'static, DispatchResult<()>> {
        let logged = TracingEventSink.emit(event.clone());
        let sink = self.clone();
        Box::pin(async move {
            logged.await?;
            post_json(sink.client.post(&sink.endpoint), &sink.endpoint, &event).await
        })
    }
}
