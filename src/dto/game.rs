//! Save request body.

use std::collections::HashMap;

use serde::Deserialize;
use serde_with::{DefaultOnNull, serde_as};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dto::validation::validate_game_snapshot, state::game::Game};

/// Body of `POST /games/save`: an action, its string arguments and the full client snapshot.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SaveGameRequest {
    /// Action name, e.g. `StartGame` or `AcquireTreasure`.
    #[validate(length(min = 1, message = "action must not be empty"))]
    pub action: String,
    /// Action arguments such as `teamId` or `playerId`. Unknown keys are ignored.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub arguments: HashMap<String, String>,
    /// Snapshot including the client's mutation and the version token it last observed.
    #[validate(custom(function = "validate_game_snapshot"))]
    pub game: Game,
}

impl SaveGameRequest {
    /// Request without arguments.
    pub fn new(action: impl Into<String>, game: Game) -> Self {
        Self {
            action: action.into(),
            arguments: HashMap::new(),
            game,
        }
    }

    /// Add one action argument, stringified.
    pub fn with_argument(mut self, key: &str, value: impl ToString) -> Self {
        self.arguments.insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_arguments_become_empty() {
        let request: SaveGameRequest = serde_json::from_str(
            r#"{
                "action": "StartGame",
                "arguments": null,
                "game": { "id": "6f1c1f0e-8f5e-4d8e-9a43-2d1f3c0b5a11", "isPersisted": true }
            }"#,
        )
        .unwrap();

        assert!(request.arguments.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn empty_action_fails_validation() {
        let request: SaveGameRequest = serde_json::from_str(
            r#"{ "action": "", "game": { "id": "6f1c1f0e-8f5e-4d8e-9a43-2d1f3c0b5a11" } }"#,
        )
        .unwrap();

        assert!(request.validate().is_err());
    }
}
