//! End-of-game timers.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Serialize;
use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DispatchError, DispatchResult, post_json};

/// Request to end a game once its allotted time is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndGameTrigger {
    /// Game to end.
    pub game_id: Uuid,
    /// Minutes to wait before ending it.
    pub delay_minutes: u32,
}

/// Delivers an end-game trigger once after its delay. Delivery may repeat; the receiver
/// relies on `EndGame` being a no-op on ended games.
pub trait EndGameScheduler: Send + Sync {
    /// Arm the timer for `trigger`.
    fn schedule(&self, trigger: EndGameTrigger) -> BoxFuture<'static, DispatchResult<()>>;
}

/// In-process timer feeding the end-game worker channel.
#[derive(Clone)]
pub struct LocalEndGameScheduler {
    tx: mpsc::UnboundedSender<Uuid>,
    minute: Duration,
}

impl LocalEndGameScheduler {
    /// Scheduler feeding `tx` with real minutes.
    pub fn new(tx: mpsc::UnboundedSender<Uuid>) -> Self {
        Self::with_minute(tx, Duration::from_secs(60))
    }

    /// Scale the length of a minute, for tests.
    pub fn with_minute(tx: mpsc::UnboundedSender<Uuid>, minute: Duration) -> Self {
        Self { tx, minute }
    }
}

impl EndGameScheduler for LocalEndGameScheduler {
    fn schedule(&self, trigger: EndGameTrigger) -> BoxFuture<'static, DispatchResult<()>> {
        let tx = self.tx.clone();
        let delay = self.minute * trigger.delay_minutes;
        Box::pin(async move {
            if tx.is_closed() {
                return Err(DispatchError::WorkerClosed);
            }
            debug!(game_id = %trigger.game_id, ?delay, "end-game timer armed");
            tokio::spawn(async move {
                sleep(delay).await;
                if tx.send(trigger.game_id).is_err() {
                    warn!(game_id = %trigger.game_id, "end-game worker stopped before timer fired");
                }
            });
            Ok(())
        })
    }
}

/// Hands the trigger to an external delayed-delivery service, which later calls
/// `POST /games/{id}/timer/elapsed`.
#[derive(Clone)]
pub struct WebhookEndGameScheduler {
    client: Client,
    endpoint: String,
}

impl WebhookEndGameScheduler {
    /// Scheduler posting triggers to `endpoint`.
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookBody {
    #[serde(flatten)]
    trigger: EndGameTrigger,
    callback_path: String,
}

impl EndGameScheduler for WebhookEndGameScheduler {
    fn schedule(&self, trigger: EndGameTrigger) -> BoxFuture<'static, DispatchResult<()>> {
        let scheduler = self.clone();
        Box::pin(async move {
            let body = WebhookBody {
                trigger,
                callback_path: format!("/games/{}/timer/elapsed", trigger.game_id),
            };
            post_json(
                scheduler.client.post(&scheduler.endpoint),
                &scheduler.endpoint,
                &body,
            )
            .await
        })
    }
}
