//! CouchDB implementation of the game store.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::StoredGame,
        storage::{StorageError, StorageResult},
    },
    state::game::{Game, VersionToken},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        CouchGameDocument, ENTRY_CODE_INDEX, EntryCodeReservation, FindResponse, PutResponse,
        game_doc_id,
    },
};

/// Game store over the CouchDB HTTP API. `_rev` doubles as the version token.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Build the client, then make sure the database and the entry-code index exist.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .username
                .zip(config.password)
                .map(|(user, pass)| (Arc::from(user), Arc::from(pass))),
        };

        store.ensure_database().await?;
        info!(database = %store.database, "CouchDB game store ready");
        Ok(store)
    }

    /// Request against `{database}/{path}`, or the database itself for an empty path.
    fn request(&self, method: Method, path: &str) -> (String, RequestBuilder) {
        let path = if path.is_empty() {
            self.database.to_string()
        } else {
            format!("{}/{}", self.database, path)
        };
        let mut builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        if let Some((user, pass)) = &self.auth {
            builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
        }
        (path, builder)
    }

    async fn send(path: &str, builder: RequestBuilder) -> CouchResult<Response> {
        builder.send().await.map_err(|source| CouchDaoError::Send {
            path: path.to_string(),
            source,
        })
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> CouchResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|source| CouchDaoError::Decode {
                path: path.to_string(),
                source,
            })
    }

    fn unexpected(path: &str, status: StatusCode) -> CouchDaoError {
        CouchDaoError::Status {
            path: path.to_string(),
            status,
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let (path, builder) = self.request(Method::GET, "");
        match Self::send(&path, builder).await?.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                let (path, create) = self.request(Method::PUT, "");
                let status = Self::send(&path, create).await?.status();
                // 412: created concurrently by another instance.
                if !status.is_success() && status != StatusCode::PRECONDITION_FAILED {
                    return Err(Self::unexpected(&path, status));
                }
                debug!(database = %self.database, "created CouchDB database");
            }
            other => return Err(Self::unexpected(&path, other)),
        }

        // Creating an index that already exists is a no-op.
        let (path, builder) = self.request(Method::POST, "_index");
        let body = json!({
            "index": { "fields": ["entryCode"] },
            "name": ENTRY_CODE_INDEX,
            "type": "json",
        });
        let response = Self::send(&path, builder.json(&body)).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::unexpected(&path, response.status()))
        }
    }

    async fn get_document<T: DeserializeOwned>(&self, doc_id: &str) -> CouchResult<Option<T>> {
        let (path, builder) = self.request(Method::GET, doc_id);
        let response = Self::send(&path, builder).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Self::decode(&path, response).await.map(Some),
            other => Err(Self::unexpected(&path, other)),
        }
    }

    /// CouchDB answers 409 when `_rev` is stale or, without `_rev`, when the id is taken.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<PutResponse>
    where
        T: Serialize,
    {
        let (path, builder) = self.request(Method::PUT, doc_id);
        let response = Self::send(&path, builder.json(document)).await?;
        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict { path }),
            status if status.is_success() => Self::decode(&path, response).await,
            other => Err(Self::unexpected(&path, other)),
        }
    }

    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<()> {
        let (path, builder) = self.request(Method::DELETE, doc_id);
        let response = Self::send(&path, builder.query(&[("rev", rev)])).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::unexpected(&path, response.status()))
        }
    }

    /// Claim `code` for `game_id`. Returns the revision of a new claim, `None` when the
    /// game already held it.
    async fn reserve_entry_code(&self, code: &str, game_id: Uuid) -> StorageResult<Option<String>> {
        let reservation = EntryCodeReservation::new(code, game_id);
        match self.put_document(&reservation.id, &reservation).await {
            Ok(PutResponse { rev }) => Ok(Some(rev)),
            Err(CouchDaoError::Conflict { .. }) => {
                let holder = self
                    .get_document::<EntryCodeReservation>(&reservation.id)
                    .await?;
                match holder {
                    Some(holder) if holder.game_id == game_id => Ok(None),
                    _ => Err(StorageError::EntryCodeTaken {
                        code: code.to_string(),
                    }),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn insert(&self, game: Game) -> StorageResult<StoredGame> {
        let Some(code) = game.entry_code.clone() else {
            return self.write(game, None).await;
        };
        let reservation = EntryCodeReservation::new(&code, game.id);
        let claimed = self.reserve_entry_code(&code, game.id).await?;

        let written = self.write(game, None).await;
        if let (Err(_), Some(rev)) = (&written, claimed) {
            if let Err(err) = self.delete_document(&reservation.id, &rev).await {
                warn!(entry_code = %code, error = %err, "failed to release entry code reservation");
            }
        }
        written
    }

    async fn find_by_entry_code(&self, entry_code: &str) -> CouchResult<Option<CouchGameDocument>> {
        let (path, builder) = self.request(Method::POST, "_find");
        let body = json!({
            "selector": { "entryCode": entry_code },
            "use_index": ENTRY_CODE_INDEX,
            "limit": 1,
        });
        let response = Self::send(&path, builder.json(&body)).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(&path, response.status()));
        }
        let found: FindResponse = Self::decode(&path, response).await?;
        Ok(found.docs.into_iter().next())
    }

    /// Entry codes are fixed once the game is created, so updates leave reservations alone.
    async fn write(&self, game: Game, expected: Option<VersionToken>) -> StorageResult<StoredGame> {
        let id = game.id;
        let document = CouchGameDocument::new(game, expected.clone());

        match self.put_document(&document.id, &document).await {
            Ok(PutResponse { rev }) => {
                debug!(game_id = %id, rev = %rev, "game document written");
                Ok(StoredGame::new(document.game, VersionToken::new(rev)))
            }
            Err(CouchDaoError::Conflict { .. }) => match expected {
                None => Err(StorageError::AlreadyExists { id }),
                // A stale revision on a document that does not exist is a miss.
                Some(expected) => {
                    let current = self
                        .get_document::<CouchGameDocument>(&document.id)
                        .await?;
                    match current {
                        None => Err(StorageError::NotFound { id }),
                        Some(_) => Err(StorageError::VersionConflict { id, expected }),
                    }
                }
            },
            Err(err) => Err(err.into()),
        }
    }
}

impl GameStore for CouchGameStore {
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.get_document::<CouchGameDocument>(&game_doc_id(id)).await?;
            Ok(document.map(CouchGameDocument::try_into_stored).transpose()?)
        })
    }

    fn find_game_by_entry_code(
        &self,
        entry_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<StoredGame>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.find_by_entry_code(&entry_code).await?;
            Ok(document.map(CouchGameDocument::try_into_stored).transpose()?)
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
        Box::pin(async move { store.write(game, Some(expected)).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let (path, builder) = store.request(Method::GET, "");
            let response = CouchGameStore::send(&path, builder).await?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchGameStore::unexpected(&path, response.status()).into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ensure_database().await?) })
    }
}
