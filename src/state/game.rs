//! Treasure-hunt aggregate as exchanged with mobile clients and persisted by the stores.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque concurrency witness issued by the store on every successful write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a backend-specific revision marker.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audience channel used when delivering push notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    /// Test builds registered against the development push channel.
    Dev,
    /// Store builds.
    #[default]
    Production,
}

/// Aggregate root for one hunt session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Client-generated identity, immutable.
    pub id: Uuid,
    /// Short shareable code used by players to join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_code: Option<String>,
    /// Version last observed by the writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_token: Option<VersionToken>,
    /// False until the first successful insert.
    #[serde(default)]
    pub is_persisted: bool,
    /// Stamped by the first `StartGame`.
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_date: Option<OffsetDateTime>,
    /// Stamped when the game ends; no further changes are accepted.
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub end_date: Option<OffsetDateTime>,
    /// Allotted play time once started.
    #[serde(default)]
    pub duration_minutes: u32,
    /// Winner once ended; `None` with an end date set means a draw.
    #[serde(default)]
    pub winning_team_id: Option<Uuid>,
    /// Competing teams in display order.
    #[serde(default)]
    pub teams: Vec<Team>,
    /// Everything there is to find.
    #[serde(default)]
    pub treasures: Vec<Treasure>,
    /// Push channel of the devices playing this game.
    #[serde(default)]
    pub app_mode: AppMode,
}

/// A group of players competing together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Stable team identity.
    pub id: Uuid,
    /// Shown in notifications.
    pub name: String,
    /// Current members.
    #[serde(default)]
    pub players: Vec<Player>,
    /// Treasures found so far, in order of discovery.
    #[serde(default)]
    pub acquired_treasures: Vec<AcquiredTreasure>,
}

/// Participant identity as known to the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Assigned on first registration.
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Display name.
    pub alias: String,
    /// Contact address, if the player gave one.
    #[serde(default)]
    pub email: Option<String>,
    /// Push registration; players without one only see changes on refresh.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Avatar image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Something to find, with its base value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Treasure {
    /// Stable treasure identity.
    pub id: Uuid,
    /// Clue shown to players.
    pub hint: String,
    /// Base value.
    pub points: u32,
    /// Reference picture.
    #[serde(default)]
    pub image_source: Option<String>,
    /// Descriptive tags.
    #[serde(default)]
    pub attributes: Vec<TreasureAttribute>,
}

/// Tag describing what a treasure looks like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreasureAttribute {
    /// Tag label.
    pub name: String,
}

/// Proof that a team found a treasure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcquiredTreasure {
    /// Identity of this acquisition.
    pub id: Uuid,
    /// Treasure that was found.
    pub treasure_id: Uuid,
    /// Player who found it.
    pub player_id: Uuid,
    /// Points actually awarded, may differ from the treasure's base value.
    pub claimed_points: u32,
    /// Photo taken as proof.
    #[serde(default)]
    pub image_source: Option<String>,
}

impl Game {
    /// Whether the game reached its terminal state.
    pub fn has_ended(&self) -> bool {
        self.end_date.is_some()
    }

    /// Whether the game clock was started.
    pub fn has_started(&self) -> bool {
        self.start_date.is_some()
    }

    /// Team with `id`, if any.
    pub fn team(&self, id: Uuid) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == id)
    }

    /// Treasure with `id`, if any.
    pub fn treasure(&self, id: Uuid) -> Option<&Treasure> {
        self.treasures.iter().find(|treasure| treasure.id == id)
    }

    /// Look a player up across every team.
    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.all_players().find(|player| player.id == Some(id))
    }

    /// Every player of every team, in team order.
    pub fn all_players(&self) -> impl Iterator<Item = &Player> {
        self.teams.iter().flat_map(|team| team.players.iter())
    }
}

impl Team {
    /// Sum of the points awarded for every acquisition. Widened so client-supplied
    /// claims cannot overflow.
    pub fn total_points(&self) -> u64 {
        self.acquired_treasures
            .iter()
            .map(|acquired| u64::from(acquired.claimed_points))
            .sum()
    }

    /// Acquisition with `id` recorded by this team.
    pub fn acquired_treasure(&self, id: Uuid) -> Option<&AcquiredTreasure> {
        self.acquired_treasures
            .iter()
            .find(|acquired| acquired.id == id)
    }

    /// Whether player `id` is a member.
    pub fn has_player(&self, id: Uuid) -> bool {
        self.players.iter().any(|player| player.id == Some(id))
    }
}
