//! Named analytics events emitted around game saves.

use indexmap::IndexMap;
use serde::Serialize;
use time::macros::format_description;
use uuid::Uuid;

use crate::{
    services::notifications,
    state::{game::Game, state_machine::GameAction},
};

/// Emitted once per inserted game, with its JSON.
pub const GAME_CREATED: &str = "New game created";
/// A save lost against a newer version.
pub const VERSION_COLLISION: &str = "Game save attempt resulted in version collision";
/// Any committed update.
pub const GAME_SAVED: &str = "Game saved successfully";
/// The game ended, by timer, request or winning acquisition.
pub const GAME_ENDED: &str = "Game ended";
/// Emitted for `JoinTeam`.
pub const PLAYER_JOINED_TEAM: &str = "Player joined team";
/// Emitted for `LeaveTeam`.
pub const PLAYER_LEFT_TEAM: &str = "Player left team";
/// Emitted for `AcquireTreasure`.
pub const TEAM_ACQUIRED_TREASURE: &str = "Team acquired treasure";
/// Emitted for `AddTreasure`.
pub const TREASURE_ADDED: &str = "Treasure added to game";
/// Failure reported by the telemetry helper.
pub const EXCEPTION_OCCURRED: &str = "EXCEPTION OCCURRED";

/// One analytics record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Event name, one of the constants above.
    pub name: String,
    /// Free-form attributes in insertion order.
    pub attributes: IndexMap<String, String>,
    /// Game the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<Uuid>,
    /// Player who triggered it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<Uuid>,
}

impl AuditEvent {
    /// Event without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            game_id: None,
            player_id: None,
        }
    }

    /// Add or replace one attribute.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// Attach the game and acting player.
    pub fn for_game(mut self, game_id: Uuid, player_id: Option<Uuid>) -> Self {
        self.game_id = Some(game_id);
        self.player_id = player_id;
        self
    }
}

/// New game, with its pretty-printed JSON.
pub fn game_created(game: &Game) -> AuditEvent {
    let json = serde_json::to_string_pretty(game).unwrap_or_default();
    AuditEvent::new(GAME_CREATED)
        .with("json", json)
        .for_game(game.id, None)
}

/// Stale version token on save.
pub fn version_collision(game_id: Uuid, player_id: Option<Uuid>) -> AuditEvent {
    AuditEvent::new(VERSION_COLLISION).for_game(game_id, player_id)
}

/// Committed update.
pub fn game_saved(game_id: Uuid, player_id: Option<Uuid>) -> AuditEvent {
    AuditEvent::new(GAME_SAVED).for_game(game_id, player_id)
}

/// Failure report.
pub fn exception(message: impl ToString, game_id: Option<Uuid>) -> AuditEvent {
    let mut event = AuditEvent::new(EXCEPTION_OCCURRED).with("message", message);
    event.game_id = game_id;
    event
}

/// Event describing what `action` did to the committed `game`, if that action has one.
pub fn for_action(game: &Game, action: &GameAction, player_id: Option<Uuid>) -> Option<AuditEvent> {
    let event = match action {
        GameAction::StartGame => {
            let started_at = game
                .start_date
                .and_then(|date| {
                    date.format(format_description!("[hour]:[minute]:[second]"))
                        .ok()
                })
                .unwrap_or_default();
            AuditEvent::new(format!("Game started at {started_at}"))
        }
        GameAction::EndGame => AuditEvent::new(GAME_ENDED)
            .with("result", notifications::end_result(game))
            .with("standings", notifications::standings(game)),
        GameAction::JoinTeam(args) => {
            let team = game.team(args.team_id)?;
            AuditEvent::new(PLAYER_JOINED_TEAM).with("team", &team.name)
        }
        GameAction::LeaveTeam(args) => {
            let team = game.team(args.team_id)?;
            AuditEvent::new(PLAYER_LEFT_TEAM)
                .with("team", &team.name)
                .with("player", &args.player_alias)
        }
        GameAction::AcquireTreasure(args) => {
            let team = game.team(args.team_id)?;
            let acquired = team.acquired_treasure(args.acquired_treasure_id)?;
            let treasure = game.treasure(acquired.treasure_id)?;
            AuditEvent::new(TEAM_ACQUIRED_TREASURE)
                .with("team", &team.name)
                .with("hint", &treasure.hint)
                .with("source", treasure.image_source.as_deref().unwrap_or_default())
                .with("points", acquired.claimed_points)
                .with("sent", acquired.image_source.as_deref().unwrap_or_default())
        }
        GameAction::AddTreasure(args) => {
            let treasure = game.treasure(args.treasure_id)?;
            let tags = treasure
                .attributes
                .iter()
                .map(|attribute| attribute.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            AuditEvent::new(TREASURE_ADDED)
                .with("hint", &treasure.hint)
                .with("tags", tags)
                .with("points", treasure.points)
                .with("source", treasure.image_source.as_deref().unwrap_or_default())
        }
        GameAction::Create | GameAction::UpdatePlayer | GameAction::Other(_) => return None,
    };

    Some(event.for_game(game.id, player_id))
}
