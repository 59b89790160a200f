#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use uuid::Uuid;

use hunt_back::{
    config::AppConfig,
    dao::game_store::memory::InMemoryGameStore,
    dto::game::SaveGameRequest,
    error::ServiceError,
    services::{
        audit_events::AuditEvent,
        dispatch::{
            DispatchResult, EndGameScheduler, EndGameTrigger, EventSink, PushPayload,
            PushTransport,
        },
        save_game_service,
    },
    state::{
        AppState, Collaborators, PushChannels, SharedState,
        game::{AcquiredTreasure, AppMode, Game, Player, Team, Treasure},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitledPush {
    pub title: String,
    pub message: String,
    pub devices: Vec<String>,
}

#[derive(Default)]
pub struct RecordingPush {
    pub titled: Mutex<Vec<TitledPush>>,
    pub silent: Mutex<Vec<Vec<String>>>,
}

impl PushTransport for RecordingPush {
    fn send_titled(
        &self,
        title: String,
        message: String,
        devices: Vec<String>,
        _payload: PushPayload,
    ) -> BoxFuture<'static, DispatchResult<()>> {
        self.titled.lock().unwrap().push(TitledPush {
            title,
            message,
            devices,
        });
        Box::pin(async { Ok(()) })
    }

    fn send_silent(
        &self,
        devices: Vec<String>,
        _payload: PushPayload,
    ) -> BoxFuture<'static, DispatchResult<()>> {
        self.silent.lock().unwrap().push(devices);
        Box::pin(async { Ok(()) })
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub events: Mutex<Vec<AuditEvent>>,
}

impl RecordingEvents {
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.name.clone())
            .collect()
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: AuditEvent) -> BoxFuture<'static, DispatchResult<()>> {
        self.events.lock().unwrap().push(event);
        Box::pin(async { Ok(()) })
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    pub triggers: Mutex<Vec<EndGameTrigger>>,
}

impl EndGameScheduler for RecordingScheduler {
    fn schedule(&self, trigger: EndGameTrigger) -> BoxFuture<'static, DispatchResult<()>> {
        self.triggers.lock().unwrap().push(trigger);
        Box::pin(async { Ok(()) })
    }
}

/// Application state over an in-memory store with recording collaborators.
pub struct Harness {
    pub state: SharedState,
    pub push: Arc<RecordingPush>,
    pub events: Arc<RecordingEvents>,
    pub scheduler: Arc<RecordingScheduler>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let harness = Self::without_store(config);
        harness
            .state
            .install_game_store(Arc::new(InMemoryGameStore::new()))
            .await;
        harness
    }

    pub fn without_store(config: AppConfig) -> Self {
        let push = Arc::new(RecordingPush::default());
        let events = Arc::new(RecordingEvents::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let state = AppState::new(
            config,
            Collaborators {
                push: PushChannels {
                    dev: push.clone(),
                    production: push.clone(),
                },
                events: events.clone(),
                scheduler: scheduler.clone(),
            },
        );
        Self {
            state,
            push,
            events,
            scheduler,
        }
    }

    /// Save and wait until every side effect was handed to the collaborators.
    pub async fn save(&self, request: SaveGameRequest) -> Result<Game, ServiceError> {
        let saved = save_game_service::save_game(&self.state, request).await?;
        if let Some(dispatch) = saved.dispatch {
            dispatch.await.unwrap();
        }
        Ok(saved.game)
    }

    pub async fn create(&self, game: Game) -> Game {
        self.save(SaveGameRequest::new("Create", game)).await.unwrap()
    }

    pub fn clear_recordings(&self) {
        self.push.titled.lock().unwrap().clear();
        self.push.silent.lock().unwrap().clear();
        self.events.events.lock().unwrap().clear();
        self.scheduler.triggers.lock().unwrap().clear();
    }
}

pub fn player(alias: &str, device: &str) -> Player {
    Player {
        id: Some(Uuid::new_v4()),
        alias: alias.into(),
        email: None,
        device_id: Some(device.into()),
        avatar: None,
    }
}

fn team(name: &str, players: Vec<Player>) -> Team {
    Team {
        id: Uuid::new_v4(),
        name: name.into(),
        players,
        acquired_treasures: Vec::new(),
    }
}

fn treasure(hint: &str, points: u32) -> Treasure {
    Treasure {
        id: Uuid::new_v4(),
        hint: hint.into(),
        points,
        image_source: None,
        attributes: Vec::new(),
    }
}

/// Unsaved game: team A (ana, al), team B (bea), one treasure worth 10.
pub fn new_game() -> Game {
    Game {
        id: Uuid::new_v4(),
        entry_code: None,
        version_token: None,
        is_persisted: false,
        start_date: None,
        end_date: None,
        duration_minutes: 30,
        winning_team_id: None,
        teams: vec![
            team("A", vec![player("ana", "d-ana"), player("al", "d-al")]),
            team("B", vec![player("bea", "d-bea")]),
        ],
        treasures: vec![treasure("red bench", 10)],
        app_mode: AppMode::Dev,
    }
}

/// Record an acquisition of `treasure_index` by the first player of `team_index`.
pub fn acquire(game: &mut Game, team_index: usize, treasure_index: usize) -> AcquiredTreasure {
    let treasure = &game.treasures[treasure_index];
    let team = &mut game.teams[team_index];
    let acquisition = AcquiredTreasure {
        id: Uuid::new_v4(),
        treasure_id: treasure.id,
        player_id: team.players[0].id.unwrap(),
        claimed_points: treasure.points,
        image_source: None,
    };
    team.acquired_treasures.push(acquisition.clone());
    acquisition
}
