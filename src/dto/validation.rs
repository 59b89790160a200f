//! Validation helpers for DTOs.

use std::collections::HashSet;

use uuid::Uuid;
use validator::ValidationError;

use crate::state::game::Game;

/// Length of a generated entry code.
pub const ENTRY_CODE_LENGTH: usize = 6;

/// Validates that an entry code is exactly six ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_entry_code("042917") // Ok
/// validate_entry_code("42917")  // Err - too short
/// validate_entry_code("04291a") // Err - not a digit
/// ```
pub fn validate_entry_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != ENTRY_CODE_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("entry_code_format");
        err.message = Some(
            format!("Entry code must be exactly {ENTRY_CODE_LENGTH} digits (got `{code}`)").into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Structural checks on a submitted snapshot: unique team, treasure and player ids and a
/// well-formed entry code when one is present.
pub fn validate_game_snapshot(game: &Game) -> Result<(), ValidationError> {
    if let Some(code) = &game.entry_code {
        validate_entry_code(code)?;
    }

    if let Some(id) = first_duplicate(game.teams.iter().map(|team| team.id)) {
        return Err(duplicate("duplicate_team_id", "team", id));
    }
    if let Some(id) = first_duplicate(game.treasures.iter().map(|treasure| treasure.id)) {
        return Err(duplicate("duplicate_treasure_id", "treasure", id));
    }
    for team in &game.teams {
        if let Some(id) = first_duplicate(team.players.iter().filter_map(|player| player.id)) {
            return Err(duplicate("duplicate_player_id", "player", id));
        }
    }

    Ok(())
}

fn first_duplicate(mut ids: impl Iterator<Item = Uuid>) -> Option<Uuid> {
    let mut seen = HashSet::new();
    ids.find(|id| !seen.insert(*id))
}

fn duplicate(code: &'static str, kind: &str, id: Uuid) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(format!("{kind} id {id} appears more than once").into());
    err
}
