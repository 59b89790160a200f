//! Shared application state and the domain model.

pub mod game;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::game_store::GameStore,
    error::ServiceError,
    services::dispatch::{EndGameScheduler, EventSink, PushTransport},
    state::game::AppMode,
};

/// Handle shared by every route and worker.
pub type SharedState = Arc<AppState>;

/// Push transports per audience channel.
#[derive(Clone)]
pub struct PushChannels {
    /// Channel for development builds.
    pub dev: Arc<dyn PushTransport>,
    /// Channel for store builds.
    pub production: Arc<dyn PushTransport>,
}

impl PushChannels {
    /// Transport matching the game's `appMode`.
    pub fn for_mode(&self, mode: AppMode) -> Arc<dyn PushTransport> {
        match mode {
            AppMode::Dev => self.dev.clone(),
            AppMode::Production => self.production.clone(),
        }
    }
}

/// Outbound collaborators injected by the entry point.
#[derive(Clone)]
pub struct Collaborators {
    /// Push notification channels.
    pub push: PushChannels,
    /// Analytics event sink.
    pub events: Arc<dyn EventSink>,
    /// Timer that ends started games.
    pub scheduler: Arc<dyn EndGameScheduler>,
}

/// Central application state: the storage handle, configuration and collaborators.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    collaborators: Collaborators,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, collaborators: Collaborators) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            config,
            collaborators,
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, or [`ServiceError::Degraded`] when none is usable.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.mark_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.mark_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Outbound collaborators.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn mark_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
