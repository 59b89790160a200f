//! MongoDB document shapes.

use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dao::models::StoredGame,
    state::game::{Game, VersionToken},
};

/// Game document; `version` is bumped on every replace and matched in the update filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    /// Game id as a string.
    #[serde(rename = "_id")]
    pub id: String,
    /// Compare-and-swap counter.
    pub version: i64,
    /// Stored snapshot.
    pub game: Game,
}

impl MongoGameDocument {
    /// Document for `game` at `version`.
    pub fn new(mut game: Game, version: i64) -> Self {
        game.version_token = None;
        game.is_persisted = true;
        Self {
            id: game.id.to_string(),
            version,
            game,
        }
    }
}

impl From<MongoGameDocument> for StoredGame {
    fn from(value: MongoGameDocument) -> Self {
        StoredGame::new(value.game, VersionToken::new(value.version.to_string()))
    }
}

/// Filter matching game `id`.
pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Numeric version carried by a token, `None` when the token was not issued by this store.
pub fn parse_version(token: &VersionToken) -> Option<i64> {
    token.as_str().parse().ok()
}
