//! Request orchestration for game saves: parse, process, persist, then fan out side effects.

use std::sync::Arc;

use rand::Rng;
use time::OffsetDateTime;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{game_store::GameStore, models::StoredGame, storage::StorageError},
    dto::{game::SaveGameRequest, validation::ENTRY_CODE_LENGTH},
    error::ServiceError,
    services::{
        audit_events::{self, AuditEvent},
        dispatch::{EndGameTrigger, PushPayload},
        game_service::{self, Decision, Outcome, ProcessContext},
        notifications::{self, NotificationPlan},
        telemetry::track_exception,
    },
    state::{
        AppState, SharedState,
        game::Game,
        state_machine::{GameAction, GameCommand},
    },
};

/// Times the end-game worker re-reads and retries after losing a race with a client.
const END_GAME_ATTEMPTS: usize = 3;

/// Canonical snapshot returned to the caller, plus the task delivering side effects.
#[derive(Debug)]
pub struct SavedGame {
    /// Game as stored after the write.
    pub game: Game,
    /// Completes once pushes, events and the timer were handed to their collaborators.
    pub dispatch: Option<JoinHandle<()>>,
}

/// Apply one client action to a game and persist the result.
pub async fn save_game(
    state: &SharedState,
    request: SaveGameRequest,
) -> Result<SavedGame, ServiceError> {
    let game_id = request.game.id;
    let command = match GameCommand::parse(&request.action, &request.arguments) {
        Ok(command) => command,
        Err(err) => {
            let err = ServiceError::from(err);
            track_exception(state, &err, Some(game_id)).await;
            return Err(err);
        }
    };

    match apply(state, request.game, &command).await {
        Ok(saved) => Ok(saved),
        Err(err) if err.is_conflict() => {
            info!(game_id = %game_id, action = %command.action, "save rejected: {err}");
            let event = audit_events::version_collision(game_id, command.acting_player_id);
            if let Err(sink_err) = state.collaborators().events.emit(event).await {
                warn!(error = %sink_err, "failed to report version collision");
            }
            Err(err)
        }
        Err(err) => {
            track_exception(state, &err, Some(game_id)).await;
            Err(err)
        }
    }
}

async fn apply(
    state: &SharedState,
    game: Game,
    command: &GameCommand,
) -> Result<SavedGame, ServiceError> {
    let store = state.require_game_store().await?;
    let game_id = game.id;

    let stored = if game.is_persisted {
        store.find_game(game_id).await?
    } else {
        None
    };

    let ctx = ProcessContext {
        now: OffsetDateTime::now_utc(),
        rule: &state.config().completion_rule,
    };

    match game_service::process(game, stored.as_ref(), command, ctx)? {
        Decision::Insert { game } => {
            let attempts = state.config().entry_code_attempts;
            let committed = insert_with_entry_code(store.as_ref(), game, attempts).await?;
            info!(
                game_id = %game_id,
                entry_code = committed.game.entry_code.as_deref().unwrap_or_default(),
                "game created"
            );
            let effects = SideEffects {
                events: vec![audit_events::game_created(&committed.game)],
                timer: None,
                plan: NotificationPlan::default(),
                player_id: command.acting_player_id,
                game: committed.game.clone(),
            };
            let dispatch = spawn_side_effects(state, effects);
            let current = reread(store.as_ref(), committed).await?;
            Ok(SavedGame {
                game: current.into_snapshot(),
                dispatch: Some(dispatch),
            })
        }
        Decision::Unchanged { current } => {
            debug!(game_id = %game_id, action = %command.action, "nothing to write");
            Ok(SavedGame {
                game: current.into_snapshot(),
                dispatch: None,
            })
        }
        Decision::Update {
            game,
            expected,
            outcome,
        } => {
            let committed = store.update_game(game, expected).await?;
            info!(
                game_id = %game_id,
                action = %command.action,
                version = %committed.version,
                ended = outcome.ended,
                "game saved"
            );
            let effects = SideEffects::after_update(state, &committed.game, command, &outcome);
            let dispatch = spawn_side_effects(state, effects);
            let current = reread(store.as_ref(), committed).await?;
            Ok(SavedGame {
                game: current.into_snapshot(),
                dispatch: Some(dispatch),
            })
        }
    }
}

/// Latest stored version, falling back to the record just written if it vanished since.
async fn reread(store: &dyn GameStore, committed: StoredGame) -> Result<StoredGame, ServiceError> {
    Ok(store
        .find_game(committed.game.id)
        .await?
        .unwrap_or(committed))
}

/// Insert `game`, drawing a fresh six-digit code whenever the store reports its code taken.
/// The store owns uniqueness, so concurrent creations cannot share a code.
async fn insert_with_entry_code(
    store: &dyn GameStore,
    mut game: Game,
    attempts: u32,
) -> Result<StoredGame, ServiceError> {
    if game.entry_code.is_none() {
        game.entry_code = Some(random_entry_code());
    }
    let mut redraws = 0;
    loop {
        match store.insert_game(game.clone()).await {
            Ok(committed) => return Ok(committed),
            Err(StorageError::EntryCodeTaken { code }) if redraws < attempts => {
                debug!(entry_code = %code, "entry code already in use");
                redraws += 1;
                game.entry_code = Some(random_entry_code());
            }
            Err(StorageError::EntryCodeTaken { .. }) => {
                return Err(ServiceError::InvalidState(format!(
                    "no unused entry code found after {attempts} attempts"
                )));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn random_entry_code() -> String {
    let value = rand::rng().random_range(0..10u32.pow(ENTRY_CODE_LENGTH as u32));
    format!("{value:0width$}", width = ENTRY_CODE_LENGTH)
}

/// Everything to deliver once a write committed.
struct SideEffects {
    game: Game,
    player_id: Option<Uuid>,
    events: Vec<AuditEvent>,
    timer: Option<EndGameTrigger>,
    plan: NotificationPlan,
}

impl SideEffects {
    fn after_update(
        state: &AppState,
        game: &Game,
        command: &GameCommand,
        outcome: &Outcome,
    ) -> Self {
        let player_id = command.acting_player_id;
        let mut events = vec![audit_events::game_saved(game.id, player_id)];
        events.extend(audit_events::for_action(game, &command.action, player_id));
        if outcome.ended && command.action != GameAction::EndGame {
            events.extend(audit_events::for_action(game, &GameAction::EndGame, player_id));
        }

        let timer = outcome.started.then(|| EndGameTrigger {
            game_id: game.id,
            delay_minutes: state.config().end_game_delay(game.duration_minutes),
        });

        Self {
            plan: notifications::targets(game, &outcome.notify_action, player_id),
            game: game.clone(),
            player_id,
            events,
            timer,
        }
    }
}

fn spawn_side_effects(state: &SharedState, effects: SideEffects) -> JoinHandle<()> {
    let state = Arc::clone(state);
    tokio::spawn(async move { deliver(&state, effects).await })
}

/// Failures are reported, never propagated: the write already committed.
async fn deliver(state: &AppState, effects: SideEffects) {
    let SideEffects {
        game,
        player_id,
        events,
        timer,
        plan,
    } = effects;
    let collaborators = state.collaborators();

    for event in events {
        if let Err(err) = collaborators.events.emit(event).await {
            track_exception(state, &err, Some(game.id)).await;
        }
    }

    if let Some(trigger) = timer {
        if let Err(err) = collaborators.scheduler.schedule(trigger).await {
            track_exception(state, &err, Some(game.id)).await;
        }
    }

    let push = collaborators.push.for_mode(game.app_mode);
    let payload = PushPayload::new(game.id, player_id);
    if let Some(titled) = plan.titled {
        if !plan.audience.is_empty() {
            let devices = plan.audience.into_iter().collect();
            if let Err(err) = push
                .send_titled(titled.title, titled.message, devices, payload.clone())
                .await
            {
                track_exception(state, &err, Some(game.id)).await;
            }
        }
    }
    if !plan.silent_audience.is_empty() {
        let devices = plan.silent_audience.into_iter().collect();
        if let Err(err) = push.send_silent(devices, payload.silent()).await {
            track_exception(state, &err, Some(game.id)).await;
        }
    }
}

/// End a game whose timer elapsed. Ending an already ended game is a no-op.
pub async fn end_game_timer_elapsed(
    state: &SharedState,
    game_id: Uuid,
) -> Result<SavedGame, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(stored) = store.find_game(game_id).await? else {
        return Err(ServiceError::GameNotFound(game_id));
    };

    let request = SaveGameRequest::new(GameAction::EndGame.name(), stored.into_snapshot());
    save_game(state, request).await
}

/// Consume end-game triggers from the in-process scheduler until the channel closes.
pub async fn run_end_game_worker(state: SharedState, mut rx: mpsc::UnboundedReceiver<Uuid>) {
    while let Some(game_id) = rx.recv().await {
        for attempt in 1..=END_GAME_ATTEMPTS {
            match end_game_timer_elapsed(&state, game_id).await {
                Ok(saved) => {
                    if let Some(dispatch) = saved.dispatch {
                        if let Err(err) = dispatch.await {
                            warn!(
                                game_id = %game_id,
                                error = %err,
                                "end-game side effects task failed"
                            );
                        }
                    }
                    info!(game_id = %game_id, "end-game timer handled");
                    break;
                }
                Err(err) if err.is_conflict() && attempt < END_GAME_ATTEMPTS => {
                    debug!(game_id = %game_id, attempt, "end-game timer raced a client write");
                }
                Err(err) => {
                    warn!(game_id = %game_id, error = %err, "end-game timer could not end the game");
                    break;
                }
            }
        }
    }
    debug!("end-game worker stopped");
}

/// Canonical snapshot of a game by id.
pub async fn get_game(state: &SharedState, game_id: Uuid) -> Result<Game, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .find_game(game_id)
        .await?
        .map(StoredGame::into_snapshot)
        .ok_or(ServiceError::GameNotFound(game_id))
}

/// Canonical snapshot of the game a player joins with `entry_code`.
pub async fn find_by_entry_code(
    state: &SharedState,
    entry_code: String,
) -> Result<Game, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .find_game_by_entry_code(entry_code.clone())
        .await?
        .map(StoredGame::into_snapshot)
        .ok_or(ServiceError::EntryCodeNotFound(entry_code))
}
