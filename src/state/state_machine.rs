//! Action parsing and the lifecycle each action is admitted in.

use std::{collections::HashMap, fmt};

use thiserror::Error;
use uuid::Uuid;

use crate::state::game::Game;

const ACTION_CREATE: &str = "Create";
const ACTION_START_GAME: &str = "StartGame";
const ACTION_END_GAME: &str = "EndGame";
const ACTION_ACQUIRE_TREASURE: &str = "AcquireTreasure";
const ACTION_JOIN_TEAM: &str = "JoinTeam";
const ACTION_LEAVE_TEAM: &str = "LeaveTeam";
const ACTION_ADD_TREASURE: &str = "AddTreasure";
const ACTION_UPDATE_PLAYER: &str = "UpdatePlayer";

const ARG_PLAYER_ID: &str = "playerId";
const ARG_PLAYER_ALIAS: &str = "playerAlias";
const ARG_TEAM_ID: &str = "teamId";
const ARG_ACQUIRED_TREASURE_ID: &str = "acquiredTreasureId";
const ARG_TREASURE_ID: &str = "treasureId";

/// Lifecycle phases of a hunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Built on a client, never inserted.
    New,
    /// Persisted and still accepting actions.
    Active,
    /// `endDate` is set; only idempotent `EndGame` retries are accepted.
    Ended,
}

impl GamePhase {
    /// Derive the phase from a snapshot.
    pub fn of(game: &Game) -> Self {
        if !game.is_persisted {
            GamePhase::New
        } else if game.has_ended() {
            GamePhase::Ended
        } else {
            GamePhase::Active
        }
    }
}

/// Typed arguments for `AcquireTreasure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireTreasureArgs {
    /// Team credited with the find.
    pub team_id: Uuid,
    /// Acquisition recorded on that team.
    pub acquired_treasure_id: Uuid,
}

/// Typed arguments for `JoinTeam`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTeamArgs {
    /// Player who joined.
    pub player_id: Uuid,
    /// Team joined.
    pub team_id: Uuid,
}

/// Typed arguments for `LeaveTeam`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveTeamArgs {
    /// Alias of the player who left, since they are no longer listed.
    pub player_alias: String,
    /// Team left.
    pub team_id: Uuid,
}

/// Typed arguments for `AddTreasure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTreasureArgs {
    /// Treasure that was added.
    pub treasure_id: Uuid,
}

/// Actions a client can submit alongside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAction {
    /// First submission of a client-built game.
    Create,
    /// Start the clock and schedule the end-of-game trigger.
    StartGame,
    /// End the game and resolve the winner.
    EndGame,
    /// A team found a treasure; may end the game.
    AcquireTreasure(AcquireTreasureArgs),
    /// A player joined a team.
    JoinTeam(JoinTeamArgs),
    /// A player left a team.
    LeaveTeam(LeaveTeamArgs),
    /// A treasure was added to the hunt.
    AddTreasure(AddTreasureArgs),
    /// A player's profile changed.
    UpdatePlayer,
    /// Any action name the server does not interpret; persisted as-is.
    Other(String),
}

impl GameAction {
    /// Wire name of the action.
    pub fn name(&self) -> &str {
        match self {
            GameAction::Create => ACTION_CREATE,
            GameAction::StartGame => ACTION_START_GAME,
            GameAction::EndGame => ACTION_END_GAME,
            GameAction::AcquireTreasure(_) => ACTION_ACQUIRE_TREASURE,
            GameAction::JoinTeam(_) => ACTION_JOIN_TEAM,
            GameAction::LeaveTeam(_) => ACTION_LEAVE_TEAM,
            GameAction::AddTreasure(_) => ACTION_ADD_TREASURE,
            GameAction::UpdatePlayer => ACTION_UPDATE_PLAYER,
            GameAction::Other(name) => name,
        }
    }
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed request: the action plus the player who submitted it, when named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCommand {
    /// Parsed action.
    pub action: GameAction,
    /// From the `playerId` argument; excluded from titled pushes.
    pub acting_player_id: Option<Uuid>,
}

/// Raised when an action name/arguments pair cannot be turned into a [`GameAction`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionParseError {
    /// The action name was blank.
    #[error("action name must not be empty")]
    EmptyAction,
    /// A required argument was absent.
    #[error("action `{action}` requires argument `{argument}`")]
    MissingArgument {
        /// Action being parsed.
        action: &'static str,
        /// Name of the missing argument.
        argument: &'static str,
    },
    /// An identifier argument was not a UUID.
    #[error("argument `{argument}` is not a valid identifier: `{value}`")]
    InvalidIdentifier {
        /// Name of the argument.
        argument: &'static str,
        /// Value as received.
        value: String,
    },
}

impl GameCommand {
    /// Parse the wire action name and its string arguments. Unknown arguments are ignored.
    pub fn parse(name: &str, args: &HashMap<String, String>) -> Result<Self, ActionParseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ActionParseError::EmptyAction);
        }

        let acting_player_id = optional_id(args, ARG_PLAYER_ID)?;

        let action = match name {
            ACTION_CREATE => GameAction::Create,
            ACTION_START_GAME => GameAction::StartGame,
            ACTION_END_GAME => GameAction::EndGame,
            ACTION_ACQUIRE_TREASURE => GameAction::AcquireTreasure(AcquireTreasureArgs {
                team_id: required_id(args, ACTION_ACQUIRE_TREASURE, ARG_TEAM_ID)?,
                acquired_treasure_id: required_id(
                    args,
                    ACTION_ACQUIRE_TREASURE,
                    ARG_ACQUIRED_TREASURE_ID,
                )?,
            }),
            ACTION_JOIN_TEAM => GameAction::JoinTeam(JoinTeamArgs {
                player_id: required_id(args, ACTION_JOIN_TEAM, ARG_PLAYER_ID)?,
                team_id: required_id(args, ACTION_JOIN_TEAM, ARG_TEAM_ID)?,
            }),
            ACTION_LEAVE_TEAM => GameAction::LeaveTeam(LeaveTeamArgs {
                player_alias: required(args, ACTION_LEAVE_TEAM, ARG_PLAYER_ALIAS)?.to_owned(),
                team_id: required_id(args, ACTION_LEAVE_TEAM, ARG_TEAM_ID)?,
            }),
            ACTION_ADD_TREASURE => GameAction::AddTreasure(AddTreasureArgs {
                treasure_id: required_id(args, ACTION_ADD_TREASURE, ARG_TREASURE_ID)?,
            }),
            ACTION_UPDATE_PLAYER => GameAction::UpdatePlayer,
            other => GameAction::Other(other.to_owned()),
        };

        Ok(Self {
            action,
            acting_player_id,
        })
    }
}

fn required<'a>(
    args: &'a HashMap<String, String>,
    action: &'static str,
    argument: &'static str,
) -> Result<&'a str, ActionParseError> {
    args.get(argument)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(ActionParseError::MissingArgument { action, argument })
}

fn required_id(
    args: &HashMap<String, String>,
    action: &'static str,
    argument: &'static str,
) -> Result<Uuid, ActionParseError> {
    let value = required(args, action, argument)?;
    parse_id(argument, value)
}

fn optional_id(
    args: &HashMap<String, String>,
    argument: &'static str,
) -> Result<Option<Uuid>, ActionParseError> {
    match args.get(argument).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => parse_id(argument, value).map(Some),
        _ => Ok(None),
    }
}

fn parse_id(argument: &'static str, value: &str) -> Result<Uuid, ActionParseError> {
    Uuid::parse_str(value).map_err(|_| ActionParseError::InvalidIdentifier {
        argument,
        value: value.to_owned(),
    })
}

/// What the processor has to do for an admitted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Insert the client-built game.
    Create,
    /// Stamp the start date and schedule the end trigger.
    Start,
    /// Credit the acquisition and evaluate the win condition.
    Acquire,
    /// Stamp the end date and resolve the winner.
    End,
    /// `EndGame` on a game that already ended; nothing to write.
    AlreadyEnded,
    /// Persist the client snapshot as submitted.
    Record,
}

/// Error returned when an action is not allowed in the game's phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {action} cannot be applied while the game is {from:?}")]
pub struct InvalidTransition {
    /// Phase of the stored game.
    pub from: GamePhase,
    /// Name of the rejected action.
    pub action: String,
}

/// Decide which transition an action triggers from a phase.
pub fn admit(from: GamePhase, action: &GameAction) -> Result<Transition, InvalidTransition> {
    let transition = match (from, action) {
        (GamePhase::New, _) => Transition::Create,
        (GamePhase::Ended, GameAction::EndGame) => Transition::AlreadyEnded,
        (GamePhase::Ended, action) => {
            return Err(InvalidTransition {
                from,
                action: action.name().to_owned(),
            });
        }
        (GamePhase::Active, GameAction::Create) => {
            return Err(InvalidTransition {
                from,
                action: action.name().to_owned(),
            });
        }
        (GamePhase::Active, GameAction::StartGame) => Transition::Start,
        (GamePhase::Active, GameAction::EndGame) => Transition::End,
        (GamePhase::Active, GameAction::AcquireTreasure(_)) => Transition::Acquire,
        (GamePhase::Active, _) => Transition::Record,
    };

    Ok(transition)
}
