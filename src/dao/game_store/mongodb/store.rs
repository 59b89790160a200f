//! MongoDB implementation of the game store.

use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key, is_duplicate_key_on},
    models::{MongoGameDocument, doc_id, parse_version},
};
use crate::{
    dao::{
        game_store::GameStore,
        models::StoredGame,
        storage::{StorageError, StorageResult},
    },
    state::game::{Game, VersionToken},
};

const GAME_COLLECTION_NAME: &str = "games";
const ENTRY_CODE_INDEX: &str = "game_entry_code_unique";
const FIRST_VERSION: i64 = 1;

/// Game store over a MongoDB collection, reconnecting on demand.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        self.state.write().await.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Unique over the games that carry a code.
    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"game.entryCode": 1})
            .options(
                IndexOptions::builder()
                    .name(ENTRY_CODE_INDEX.to_owned())
                    .unique(true)
                    .partial_filter_expression(doc! {"game.entryCode": {"$type": "string"}})
                    .build(),
            )
            .build();

        self.collection()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: ENTRY_CODE_INDEX,
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn find_document(&self, id: Uuid) -> MongoResult<Option<MongoGameDocument>> {
        self.collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })
    }

    async fn find_by_entry_code(&self, entry_code: String) -> MongoResult<Option<StoredGame>> {
        let document = self
            .collection()
            .await
            .find_one(doc! {"game.entryCode": entry_code})
            .await
            .map_err(|source| MongoDaoError::LookupEntryCode { source })?;
        Ok(document.map(Into::into))
    }

    async fn insert(&self, game: Game) -> StorageResult<StoredGame> {
        let id = game.id;
        let document = MongoGameDocument::new(game, FIRST_VERSION);

        match self.collection().await.insert_one(&document).await {
            Ok(_) => Ok(document.into()),
            Err(source) if is_duplicate_key_on(&source, ENTRY_CODE_INDEX) => {
                Err(StorageError::EntryCodeTaken {
                    code: document.game.entry_code.unwrap_or_default(),
                })
            }
            Err(source) if is_duplicate_key(&source) => Err(StorageError::AlreadyExists { id }),
            Err(source) => Err(MongoDaoError::SaveGame { id, source }.into()),
        }
    }

    async fn update(&self, game: Game, expected: VersionToken) -> StorageResult<StoredGame> {
        let id = game.id;
        let Some(current) = parse_version(&expected) else {
            return match self.find_document(id).await? {
                Some(_) => Err(StorageError::VersionConflict { id, expected }),
                None => Err(StorageError::NotFound { id }),
            };
        };

        let document = MongoGameDocument::new(game, current + 1);
        let mut filter = doc_id(id);
        filter.insert("version", current);

        let result = self
            .collection()
            .await
            .replace_one(filter, &document)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;

        if result.matched_count == 1 {
            debug!(game_id = %id, version = document.version, "game document replaced");
            return Ok(document.into());
        }

        match self.find_document(id).await? {
            Some(_) => Err(StorageError::VersionConflict { id, expected }),
            None => Err(StorageError::NotFound { id }),
        }
    }
}

impl GameStore for MongoGameStore {
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.find_document(id).await?;
            Ok(document.map(Into::into))
        })
    }

    fn find_game_by_entry_code(
        &self,
        entry_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_by_entry_code(entry_code)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_game(&self, game: Game) -> BoxFuture<'static, StorageResult<StoredGame>> {
        let store = self.clone();
        Box::pin(async move { store.insert(game).await })
    }

    fn update_game(
        &self,
        game: Game,
        expected: VersionToken,
    ) -> BoxFuture<'static, StorageResult<StoredGame>> {
        let store = self.clone();
        Box::pin(async move { store.update(game, expected).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
