//! Push notification transports.

use futures::future::BoxFuture;
use indexmap::IndexMap;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{DispatchResult, post_json};

/// Custom data attached to every push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload(IndexMap<String, String>);

impl PushPayload {
    /// Payload naming the game and, when known, the acting player.
    pub fn new(game_id: Uuid, player_id: Option<Uuid>) -> Self {
        let mut data = IndexMap::new();
        data.insert("gameId".to_string(), game_id.to_string());
        if let Some(player_id) = player_id {
            data.insert("playerId".to_string(), player_id.to_string());
        }
        Self(data)
    }

    /// Payload for a background wake-up.
    pub fn silent(mut self) -> Self {
        self.0
            .insert("content-available".to_string(), "1".to_string());
        self
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Delivery of push notifications to registered devices.
pub trait PushTransport: Send + Sync {
    /// Visible notification to `devices`.
    fn send_titled(
        &self,
        title: String,
        message: String,
        devices: Vec<String>,
        payload: PushPayload,
    ) -> BoxFuture<'static, DispatchResult<()>>;

    /// Background refresh of `devices`.
    fn send_silent(
        &self,
        devices: Vec<String>,
        payload: PushPayload,
    ) -> BoxFuture<'static, DispatchResult<()>>;
}

/// Transport used when no push endpoint is configured: pushes are only logged.
#[derive(Debug, Clone)]
pub struct LogPushTransport {
    channel: &'static str,
}

impl LogPushTransport {
    /// Logging transport labelled with `channel`.
    pub fn new(channel: &'static str) -> Self {
        Self { channel }
    }
}

impl PushTransport for LogPushTransport {
    fn send_titled(
        &self,
        title: String,
        message: String,
        devices: Vec<String>,
        payload: PushPayload,
    ) -> BoxFuture<'static, DispatchResult<()>> {
        info!(
            channel = self.channel,
            %title,
            %message,
            devices = devices.len(),
            ?payload,
            "push notification"
        );
        Box::pin(async { Ok(()) })
    }

    fn send_silent(
        &self,
        devices: Vec<String>,
        payload: PushPayload,
    ) -> BoxFuture<'static, DispatchResult<()>> {
        info!(
            channel = self.channel,
            devices = devices.len(),
            ?payload,
            "silent push notification"
        );
        Box::pin(async { Ok(()) })
    }
}

/// Push provider reached over HTTP with a bearer token. Devices are addressed by id.
#[derive(Clone)]
pub struct HttpPushTransport {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpPushTransport {
    /// Transport posting to `endpoint`, with an optional bearer `token`.
    pub fn new(client: Client, endpoint: String, token: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            token,
        }
    }

    fn send(&self, body: serde_json::Value) -> BoxFuture<'static, DispatchResult<()>> {
        let transport = self.clone();
        Box::pin(async move {
            let mut request = transport.client.post(&transport.endpoint);
            if let Some(token) = &transport.token {
                request = request.bearer_auth(token);
            }
            post_json(request, &transport.endpoint, &body).await
        })
    }
}

impl PushTransport for HttpPushTransport {
    fn send_titled(
        &self,
        title: String,
        message: String,
        devices: Vec<String>,
        payload: PushPayload,
    ) -> BoxFuture<'static, DispatchResult<()>> {
        self.send(json!({
            "notification_content": {
                "name": title,
                "title": title,
                "body": message,
                "custom_data": payload,
            },
            "notification_target": {
                "type": "devices_target",
                "devices": devices,
            },
        }))
    }

    fn send_silent(
        &self,
        devices: Vec<String>,
        payload: PushPayload,
    ) -> BoxFuture<'static, DispatchResult<()>> {
        self.send(json!({
            "notification_content": {
                "name": "silent",
                "custom_data": payload,
            },
            "notification_target": {
                "type": "devices_target",
                "devices": devices,
            },
        }))
    }
}
