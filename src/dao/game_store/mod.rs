/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::StoredGame;
use crate::dao::storage::StorageResult;
use crate::state::game::{Game, VersionToken};
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for hunt games.
///
/// Writes are compare-and-swap: an insert fails with `AlreadyExists` when the id is taken and
/// an update fails with `VersionConflict` unless `expected` matches the stored token.
pub trait GameStore: Send + Sync {
    /// Record for `id` with its current version.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<StoredGame>>>;
    /// Record whose entry code is `entry_code`.
    fn find_game_by_entry_code(
        &self,
        entry_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<StoredGame>>>;
    /// Store a new game. Fails with `AlreadyExists` for a taken id and
    /// `EntryCodeTaken` when another game holds its code.
    fn insert_game(&self, game: Game) -> BoxFuture<'static, StorageResult<StoredGame>>;
    /// Replace the record if its version is still `expected`.
    fn update_game(
        &self,
        game: Game,
        expected: VersionToken,
    ) -> BoxFuture<'static, StorageResult<StoredGame>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
