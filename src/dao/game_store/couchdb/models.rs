//! CouchDB document shapes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dao::models::StoredGame,
    state::game::{Game, VersionToken},
};

use super::error::{CouchDaoError, CouchResult};

/// Prefix of game document ids.
pub const GAME_PREFIX: &str = "game::";
/// Prefix of the documents reserving an entry code for one game.
pub const ENTRY_CODE_PREFIX: &str = "entry-code::";

/// Name of the Mango index backing entry-code lookups.
pub const ENTRY_CODE_INDEX: &str = "game-entry-code";

/// Game document as stored in CouchDB; the game fields sit at the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    /// `game::{uuid}`.
    #[serde(rename = "_id")]
    pub id: String,
    /// CouchDB revision; absent on creation.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Stored snapshot.
    #[serde(flatten)]
    pub game: Game,
}

impl CouchGameDocument {
    /// Build the document to write, `rev` being the revision the write is based on.
    pub fn new(mut game: Game, rev: Option<VersionToken>) -> Self {
        game.version_token = None;
        game.is_persisted = true;
        Self {
            id: game_doc_id(game.id),
            rev: rev.map(|token| token.as_str().to_string()),
            game,
        }
    }

    /// Stored record, the revision becoming the version token.
    pub fn try_into_stored(self) -> CouchResult<StoredGame> {
        let rev = self
            .rev
            .ok_or(CouchDaoError::MissingRevision { path: self.id })?;
        Ok(StoredGame::new(self.game, VersionToken::new(rev)))
    }
}

/// Body returned by CouchDB after a successful document write.
#[derive(Debug, Deserialize)]
pub struct PutResponse {
    /// Revision of the written document.
    pub rev: String,
}

/// Mango query response.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    /// Matching documents.
    pub docs: Vec<CouchGameDocument>,
}

/// Id of the document holding game `id`.
pub fn game_doc_id(id: Uuid) -> String {
    format!("{GAME_PREFIX}{id}")
}

/// Placeholder document whose id is the entry code. CouchDB refuses a second create for
/// the same id, which makes codes unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCodeReservation {
    /// `entry-code::{code}`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Game holding the code.
    pub game_id: Uuid,
}

impl EntryCodeReservation {
    /// Reservation of `code` for `game_id`.
    pub fn new(code: &str, game_id: Uuid) -> Self {
        Self {
            id: entry_code_doc_id(code),
            game_id,
        }
    }
}

/// Id of the reservation document for `code`.
pub fn entry_code_doc_id(code: &str) -> String {
    format!("{ENTRY_CODE_PREFIX}{code}")
}
