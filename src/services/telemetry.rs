//! Failure reporting to the log and the analytics sink.

use std::fmt::Display;

use tracing::{error, warn};
use uuid::Uuid;

use crate::{services::audit_events, state::AppState};

/// Log a failure and report it to the audit sink as an exception event.
pub async fn track_exception(
    state: &AppState,
    err: &(dyn Display + Sync),
    game_id: Option<Uuid>,
) {
    error!(game_id = ?game_id, error = %err, "operation failed");

    let event = audit_events::exception(err, game_id);
    if let Err(sink_err) = state.collaborators().events.emit(event).await {
        warn!(error = %sink_err, "failed to report exception event");
    }
}
