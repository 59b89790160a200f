//! Health status derived from the degraded flag and a storage ping.

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` when the store answers, `degraded` otherwise.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.game_store().await else {
        warn!("no storage backend installed (degraded mode)");
        return HealthResponse::degraded();
    };

    match store.health_check().await {
        Ok(()) if !state.is_degraded() => HealthResponse::ok(),
        Ok(()) => HealthResponse::degraded(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
    }
}
