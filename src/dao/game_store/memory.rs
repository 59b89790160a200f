//! Process-local [`GameStore`] used when no database is configured and by the test suite.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{BoxFuture, FutureExt};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::StoredGame,
        storage::{StorageError, StorageResult},
    },
    state::game::{Game, VersionToken},
};

/// Games kept in a concurrent map. Each write holds the shard lock of its key, so the
/// version comparison and the replacement happen atomically. Entry codes are reserved in a
/// second map before the game lands, which keeps them unique across concurrent inserts.
#[derive(Clone, Default)]
pub struct InMemoryGameStore {
    games: Arc<DashMap<Uuid, StoredGame>>,
    codes: Arc<DashMap<String, Uuid>>,
    revisions: Arc<AtomicU64>,
}

impl InMemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> VersionToken {
        let revision = self.revisions.fetch_add(1, Ordering::Relaxed) + 1;
        VersionToken::new(revision.to_string())
    }

    /// Claim `code` for `id`. Returns whether this call made the claim.
    fn reserve_code(&self, code: &str, id: Uuid) -> StorageResult<bool> {
        match self.codes.entry(code.to_string()) {
            Entry::Occupied(owner) if *owner.get() != id => Err(StorageError::EntryCodeTaken {
                code: code.to_string(),
            }),
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(true)
            }
        }
    }

    fn release_code(&self, code: &str, id: Uuid) {
        self.codes.remove_if(code, |_, owner| *owner == id);
    }

    fn insert_now(&self, game: Game) -> StorageResult<StoredGame> {
        let id = game.id;
        let reserved = match &game.entry_code {
            Some(code) => self.reserve_code(code, id)?,
            None => false,
        };

        match self.games.entry(id) {
            Entry::Occupied(_) => {
                if let (true, Some(code)) = (reserved, &game.entry_code) {
                    self.release_code(code, id);
                }
                Err(StorageError::AlreadyExists { id })
            }
            Entry::Vacant(slot) => {
                let stored = StoredGame::new(game, self.next_version());
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    fn update_now(&self, game: Game, expected: VersionToken) -> StorageResult<StoredGame> {
        let id = game.id;
        let Some(mut current) = self.games.get_mut(&id) else {
            return Err(StorageError::NotFound { id });
        };
        if current.version != expected {
            return Err(StorageError::VersionConflict { id, expected });
        }
        if game.entry_code != current.game.entry_code {
            if let Some(code) = &game.entry_code {
                self.reserve_code(code, id)?;
            }
            if let Some(old) = &current.game.entry_code {
                self.release_code(old, id);
            }
        }
        let stored = StoredGame::new(game, self.next_version());
        *current = stored.clone();
        Ok(stored)
    }
}

impl GameStore for InMemoryGameStore {
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
        let found = self.games.get(&id).map(|entry| entry.value().clone());
        async move { Ok(found) }.boxed()
    }

    fn find_game_by_entry_code(
        &self,
        entry_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
        let owner = self.codes.get(&entry_code).map(|entry| *entry.value());
        let found = owner.and_then(|id| self.games.get(&id).map(|entry| entry.value().clone()));
        async move { Ok(found) }.boxed()
    }

    fn insert_game(&self, game: Game) -> BoxFuture<'static, StorageResult<StoredGame>> {
        let result = self.insert_now(game);
        async move { result }.boxed()
    }

    fn update_game(
        &self,
        game: Game,
        expected: VersionToken,
    ) -> BoxFuture<'static, StorageResult<StoredGame>> {
        let result = self.update_now(game, expected);
        async move { result }.boxed()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        async { Ok(()) }.boxed()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        async { Ok(()) }.boxed()
    }
}
