//! OpenAPI document of the REST API.

use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document for the hunt backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::save_game,
        crate::routes::game::get_game,
        crate::routes::game::get_game_by_entry_code,
        crate::routes::game::end_game_timer_elapsed,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::SaveGameRequest,
            crate::state::game::Game,
            crate::state::game::Team,
            crate::state::game::Player,
            crate::state::game::Treasure,
            crate::state::game::TreasureAttribute,
            crate::state::game::AcquiredTreasure,
            crate::state::game::AppMode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game saves and lookups"),
    )
)]
pub struct ApiDoc;
