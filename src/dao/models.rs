//! Backend-neutral stored record.

use crate::state::game::{Game, VersionToken};

/// A game as held by a store, paired with the version token of its last write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredGame {
    /// Persisted snapshot. Its `version_token` field is never trusted, `version` is.
    pub game: Game,
    /// Token issued on the last successful write.
    pub version: VersionToken,
}

impl StoredGame {
    /// Pair a snapshot with the token the store just issued for it.
    pub fn new(mut game: Game, version: VersionToken) -> Self {
        game.version_token = None;
        game.is_persisted = true;
        Self { game, version }
    }

    /// Client-facing snapshot carrying the current version token.
    pub fn into_snapshot(self) -> Game {
        let mut game = self.game;
        game.version_token = Some(self.version);
        game.is_persisted = true;
        game
    }
}
