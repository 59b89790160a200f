//! HTTP surface of the service.

use axum::Router;

use crate::state::SharedState;

/// Swagger UI.
pub mod docs;
/// Game save and read routes.
pub mod game;
/// Health check route.
pub mod health;
/// JSON body extractor.
pub mod json;

/// Compose all route trees and attach the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(game::router())
        .merge(docs::router())
        .with_state(state)
}
