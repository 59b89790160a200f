//! Game save and read endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::SaveGameRequest,
    error::AppError,
    routes::json::ApiJson,
    services::save_game_service,
    state::{SharedState, game::Game},
};

/// Routes applying client actions to games and reading them back.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/save", post(save_game))
        .route("/games/{id}", get(get_game))
        .route("/games/by-code/{entry_code}", get(get_game_by_entry_code))
        .route("/games/{id}/timer/elapsed", post(end_game_timer_elapsed))
}

/// Apply an action to a game snapshot and return the canonical persisted game.
#[utoipa::path(
    post,
    path = "/games/save",
    tag = "game",
    request_body = SaveGameRequest,
    responses(
        (status = 200, description = "Game saved", body = Game),
        (status = 400, description = "Invalid action, unknown reference or storage failure"),
        (status = 409, description = "Version token is stale; refetch the game and reapply")
    )
)]
pub async fn save_game(
    State(state): State<SharedState>,
    Valid(ApiJson(payload)): Valid<ApiJson<SaveGameRequest>>,
) -> Result<Json<Game>, AppError> {
    let saved = save_game_service::save_game(&state, payload).await?;
    Ok(Json(saved.game))
}

/// Fetch a game by id.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Current game", body = Game),
        (status = 404, description = "No such game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Game>, AppError> {
    Ok(Json(save_game_service::get_game(&state, id).await?))
}

/// Fetch the game a player joins with its entry code.
#[utoipa::path(
    get,
    path = "/games/by-code/{entry_code}",
    tag = "game",
    params(("entry_code" = String, Path, description = "Six-digit entry code")),
    responses(
        (status = 200, description = "Current game", body = Game),
        (status = 404, description = "No game uses this code")
    )
)]
pub async fn get_game_by_entry_code(
    State(state): State<SharedState>,
    Path(entry_code): Path<String>,
) -> Result<Json<Game>, AppError> {
    Ok(Json(
        save_game_service::find_by_entry_code(&state, entry_code).await?,
    ))
}

/// Callback for external schedulers once a game's time is up. Safe to call repeatedly.
#[utoipa::path(
    post,
    path = "/games/{id}/timer/elapsed",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game ended, or already was", body = Game),
        (status = 404, description = "No such game"),
        (status = 409, description = "A concurrent write won; the scheduler should retry")
    )
)]
pub async fn end_game_timer_elapsed(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Game>, AppError> {
    let saved = save_game_service::end_game_timer_elapsed(&state, id).await?;
    Ok(Json(saved.game))
}
