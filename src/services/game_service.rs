//! Applies one parsed action to a client snapshot against the stored record.
//!
//! Everything here is pure: the caller loads the stored game, hands it over together with
//! the submitted snapshot and persists whatever [`Decision`] comes back.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    dao::models::StoredGame,
    error::ServiceError,
    services::scoring::{self, CompletionRule},
    state::{
        game::{Game, VersionToken},
        state_machine::{
            AcquireTreasureArgs, GameAction, GameCommand, GamePhase, Transition, admit,
        },
    },
};

/// Inputs that do not come from the request.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext<'a> {
    /// Clock reading used for start and end stamps.
    pub now: OffsetDateTime,
    /// Rule deciding when an acquisition wins.
    pub rule: &'a CompletionRule,
}

/// What happened, for the side effects that follow a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Action the audience is computed for. A winning acquisition notifies as `EndGame`.
    pub notify_action: GameAction,
    /// The write stamps `startDate`; the end-of-game timer must be armed.
    pub started: bool,
    /// The write stamps `endDate`.
    pub ended: bool,
}

/// Result of processing a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// First submission of a client-built game.
    Insert {
        /// Game to insert, server-owned fields reset.
        game: Game,
    },
    /// Nothing to write; the stored record is already the answer.
    Unchanged {
        /// Record as currently stored.
        current: StoredGame,
    },
    /// Conditional replace of the stored record.
    Update {
        /// Snapshot to write.
        game: Game,
        /// Version the write is conditional on.
        expected: VersionToken,
        /// Side effects owed once the write commits.
        outcome: Outcome,
    },
}

/// Decide how `incoming` must be persisted.
///
/// `stored` is the record currently held for `incoming.id`, if any. It is ignored for
/// games that were never persisted.
pub fn process(
    mut incoming: Game,
    stored: Option<&StoredGame>,
    command: &GameCommand,
    ctx: ProcessContext<'_>,
) -> Result<Decision, ServiceError> {
    if !incoming.is_persisted {
        // Server-owned fields are never taken from a client on creation.
        incoming.version_token = None;
        incoming.start_date = None;
        incoming.end_date = None;
        incoming.winning_team_id = None;
        return Ok(Decision::Insert { game: incoming });
    }

    let Some(stored) = stored else {
        return Err(ServiceError::NotFound(format!("game {}", incoming.id)));
    };

    let admitted = admit(GamePhase::of(&stored.game), &command.action);
    if admitted == Ok(Transition::AlreadyEnded) {
        return Ok(Decision::Unchanged {
            current: stored.clone(),
        });
    }

    if incoming.version_token.as_ref() != Some(&stored.version) {
        return Err(ServiceError::version_conflict());
    }

    let transition = admitted?;

    incoming.entry_code = stored.game.entry_code.clone();
    incoming.start_date = stored.game.start_date;
    incoming.end_date = stored.game.end_date;
    incoming.winning_team_id = stored.game.winning_team_id;

    let mut outcome = Outcome {
        notify_action: command.action.clone(),
        started: false,
        ended: false,
    };

    match (transition, &command.action) {
        (Transition::Start, _) => {
            if stored.game.has_started() {
                return Ok(Decision::Unchanged {
                    current: stored.clone(),
                });
            }
            incoming.start_date = Some(ctx.now);
            outcome.started = true;
        }
        (Transition::End, _) => {
            end_game(&mut incoming, ctx.now);
            outcome.ended = true;
        }
        (Transition::Acquire, GameAction::AcquireTreasure(args)) => {
            check_acquisition(&incoming, args)?;
            if scoring::evaluate(&incoming, args.team_id, ctx.rule).is_winning_move {
                end_game(&mut incoming, ctx.now);
                outcome.ended = true;
                outcome.notify_action = GameAction::EndGame;
            }
        }
        (Transition::Record, action) => check_references(&incoming, action)?,
        (transition, action) => {
            return Err(ServiceError::InvalidState(format!(
                "{action} cannot be handled as {transition:?}"
            )));
        }
    }

    Ok(Decision::Update {
        game: incoming,
        expected: stored.version.clone(),
        outcome,
    })
}

/// Stamp the end date and resolve the winner, `None` being a draw.
fn end_game(game: &mut Game, now: OffsetDateTime) {
    game.end_date = Some(now);
    game.winning_team_id = scoring::resolve_winner(&scoring::rank(game));
}

fn check_acquisition(game: &Game, args: &AcquireTreasureArgs) -> Result<(), ServiceError> {
    let team = game
        .team(args.team_id)
        .ok_or_else(|| missing("team", args.team_id))?;
    let acquired = team
        .acquired_treasure(args.acquired_treasure_id)
        .ok_or_else(|| missing("acquired treasure", args.acquired_treasure_id))?;
    game.treasure(acquired.treasure_id)
        .ok_or_else(|| missing("treasure", acquired.treasure_id))?;
    Ok(())
}

fn check_references(game: &Game, action: &GameAction) -> Result<(), ServiceError> {
    match action {
        GameAction::JoinTeam(args) => {
            let team = game
                .team(args.team_id)
                .ok_or_else(|| missing("team", args.team_id))?;
            if !team.has_player(args.player_id) {
                return Err(missing("player", args.player_id));
            }
        }
        GameAction::LeaveTeam(args) => {
            game.team(args.team_id)
                .ok_or_else(|| missing("team", args.team_id))?;
        }
        GameAction::AddTreasure(args) => {
            game.treasure(args.treasure_id)
                .ok_or_else(|| missing("treasure", args.treasure_id))?;
        }
        _ => {}
    }
    Ok(())
}

fn missing(kind: &str, id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("{kind} {id}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use time::macros::datetime;

    use super::*;
    use crate::state::game::{AcquiredTreasure, AppMode, Player, Team, Treasure};

    const NOW: OffsetDateTime = datetime!(2026-10-18 12:00 UTC);

    struct Fixture {
        stored: StoredGame,
        team_a: Uuid,
        team_b: Uuid,
        player_a: Uuid,
        treasure: Uuid,
    }

    fn player(alias: &str) -> Player {
        Player {
            id: Some(Uuid::new_v4()),
            alias: alias.into(),
            email: None,
            device_id: Some(format!("device-{alias}")),
            avatar: None,
        }
    }

    fn fixture() -> Fixture {
        let a = player("ana");
        let b = player("bo");
        let player_a = a.id.unwrap();
        let treasure = Treasure {
            id: Uuid::new_v4(),
            hint: "red mailbox".into(),
            points: 10,
            image_source: None,
            attributes: Vec::new(),
        };
        let team_a = Team {
            id: Uuid::new_v4(),
            name: "A".into(),
            players: vec![a],
            acquired_treasures: Vec::new(),
        };
        let team_b = Team {
            id: Uuid::new_v4(),
            name: "B".into(),
            players: vec![b],
            acquired_treasures: Vec::new(),
        };
        let fixture_ids = (team_a.id, team_b.id, treasure.id);
        let game = Game {
            id: Uuid::new_v4(),
            entry_code: Some("123456".into()),
            version_token: None,
            is_persisted: true,
            start_date: Some(datetime!(2026-10-18 11:00 UTC)),
            end_date: None,
            duration_minutes: 30,
            winning_team_id: None,
            teams: vec![team_a, team_b],
            treasures: vec![treasure],
            app_mode: AppMode::Production,
        };
        Fixture {
            stored: StoredGame::new(game, VersionToken::new("7")),
            team_a: fixture_ids.0,
            team_b: fixture_ids.1,
            player_a,
            treasure: fixture_ids.2,
        }
    }

    fn command(name: &str, pairs: &[(&str, String)]) -> GameCommand {
        let args = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect::<HashMap<_, _>>();
        GameCommand::parse(name, &args).unwrap()
    }

    fn ctx(rule: &CompletionRule) -> ProcessContext<'_> {
        ProcessContext { now: NOW, rule }
    }

    fn run(
        game: Game,
        stored: Option<&StoredGame>,
        command: &GameCommand,
    ) -> Result<Decision, ServiceError> {
        process(game, stored, command, ctx(&CompletionRule::AllTreasures))
    }

    fn client_copy(stored: &StoredGame) -> Game {
        stored.clone().into_snapshot()
    }

    #[test]
    fn new_games_are_inserted_without_server_fields() {
        let mut game = client_copy(&fixture().stored);
        game.is_persisted = false;
        game.end_date = Some(NOW);

        let decision = run(game, None, &command("Create", &[]))
            .unwrap();
        let Decision::Insert { game } = decision else {
            panic!("expected insert, got {decision:?}");
        };
        assert_eq!(game.end_date, None);
        assert_eq!(game.version_token, None);
        assert_eq!(game.entry_code.as_deref(), Some("123456"));
    }

    #[test]
    fn stale_token_is_a_conflict() {
        let fx = fixture();
        let mut game = client_copy(&fx.stored);
        game.version_token = Some(VersionToken::new("6"));

        let err = run(game, Some(&fx.stored), &command("UpdatePlayer", &[]))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn persisted_game_missing_from_store_is_not_found() {
        let fx = fixture();
        let err = run(client_copy(&fx.stored), None, &command("UpdatePlayer", &[]))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn server_fields_take_precedence_over_client_values() {
        let fx = fixture();
        let mut game = client_copy(&fx.stored);
        game.entry_code = Some("999999".into());
        game.winning_team_id = Some(fx.team_b);
        game.start_date = None;

        let decision = run(game, Some(&fx.stored), &command("UpdatePlayer", &[]))
            .unwrap();
        let Decision::Update { game, expected, .. } = decision else {
            panic!("expected update, got {decision:?}");
        };
        assert_eq!(expected, fx.stored.version);
        assert_eq!(game.entry_code.as_deref(), Some("123456"));
        assert_eq!(game.winning_team_id, None);
        assert_eq!(game.start_date, fx.stored.game.start_date);
    }

    #[test]
    fn start_game_stamps_start_once() {
        let mut fx = fixture();
        fx.stored.game.start_date = None;

        let decision = run(client_copy(&fx.stored), Some(&fx.stored), &command("StartGame", &[]))
            .unwrap();
        let Decision::Update { game, outcome, .. } = decision else {
            panic!("expected update, got {decision:?}");
        };
        assert_eq!(game.start_date, Some(NOW));
        assert!(outcome.started);

        let mut started = fx.stored.clone();
        started.game.start_date = Some(NOW);
        let again = run(client_copy(&started), Some(&started), &command("StartGame", &[]))
            .unwrap();
        assert!(matches!(again, Decision::Unchanged { .. }));
    }

    #[test]
    fn end_game_on_ended_game_is_a_no_op_even_with_a_stale_token() {
        let mut fx = fixture();
        fx.stored.game.end_date = Some(NOW);
        let mut game = client_copy(&fx.stored);
        game.version_token = Some(VersionToken::new("stale"));

        let decision = run(game, Some(&fx.stored), &command("EndGame", &[]))
            .unwrap();
        assert_eq!(
            decision,
            Decision::Unchanged {
                current: fx.stored.clone()
            }
        );
    }

    #[test]
    fn other_actions_on_ended_game_are_rejected() {
        let mut fx = fixture();
        fx.stored.game.end_date = Some(NOW);

        let err = run(client_copy(&fx.stored), Some(&fx.stored), &command("UpdatePlayer", &[]))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[test]
    fn end_game_with_tied_scores_is_a_draw() {
        let fx = fixture();
        let decision = run(client_copy(&fx.stored), Some(&fx.stored), &command("EndGame", &[]))
            .unwrap();
        let Decision::Update { game, outcome, .. } = decision else {
            panic!("expected update, got {decision:?}");
        };
        assert_eq!(game.end_date, Some(NOW));
        assert_eq!(game.winning_team_id, None);
        assert!(outcome.ended);
    }

    #[test]
    fn completing_acquisition_ends_the_game_in_the_same_write() {
        let fx = fixture();
        let mut game = client_copy(&fx.stored);
        let acquisition = AcquiredTreasure {
            id: Uuid::new_v4(),
            treasure_id: fx.treasure,
            player_id: fx.player_a,
            claimed_points: 10,
            image_source: None,
        };
        let acquisition_id = acquisition.id;
        game.teams[0].acquired_treasures.push(acquisition);

        let command = command(
            "AcquireTreasure",
            &[
                ("teamId", fx.team_a.to_string()),
                ("acquiredTreasureId", acquisition_id.to_string()),
                ("playerId", fx.player_a.to_string()),
            ],
        );
        let decision = run(game, Some(&fx.stored), &command).unwrap();
        let Decision::Update { game, outcome, .. } = decision else {
            panic!("expected update, got {decision:?}");
        };
        assert_eq!(game.end_date, Some(NOW));
        assert_eq!(game.winning_team_id, Some(fx.team_a));
        assert_eq!(outcome.notify_action, GameAction::EndGame);
        assert!(outcome.ended);
    }

    #[test]
    fn partial_acquisition_keeps_the_game_running() {
        let fx = fixture();
        let mut game = client_copy(&fx.stored);
        let acquisition_id = Uuid::new_v4();
        game.teams[1].acquired_treasures.push(AcquiredTreasure {
            id: acquisition_id,
            treasure_id: fx.treasure,
            player_id: Uuid::new_v4(),
            claimed_points: 5,
            image_source: None,
        });

        let rule = CompletionRule::PointThreshold { points: 50 };
        let command = command(
            "AcquireTreasure",
            &[
                ("teamId", fx.team_b.to_string()),
                ("acquiredTreasureId", acquisition_id.to_string()),
            ],
        );
        let decision = process(game, Some(&fx.stored), &command, ctx(&rule)).unwrap();
        let Decision::Update { game, outcome, .. } = decision else {
            panic!("expected update, got {decision:?}");
        };
        assert_eq!(game.end_date, None);
        assert!(!outcome.ended);
        assert!(matches!(outcome.notify_action, GameAction::AcquireTreasure(_)));
    }

    #[test]
    fn acquisition_missing_from_snapshot_is_rejected() {
        let fx = fixture();
        let command = command(
            "AcquireTreasure",
            &[
                ("teamId", fx.team_a.to_string()),
                ("acquiredTreasureId", Uuid::new_v4().to_string()),
            ],
        );
        let err = run(client_copy(&fx.stored), Some(&fx.stored), &command)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn join_team_requires_the_player_in_that_team() {
        let fx = fixture();
        let command = command(
            "JoinTeam",
            &[
                ("teamId", fx.team_b.to_string()),
                ("playerId", fx.player_a.to_string()),
            ],
        );
        let err = run(client_copy(&fx.stored), Some(&fx.stored), &command)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn unknown_actions_are_recorded() {
        let fx = fixture();
        let decision = run(client_copy(&fx.stored), Some(&fx.stored), &command("RenameTeam", &[]))
            .unwrap();
        assert!(matches!(
            decision,
            Decision::Update {
                outcome: Outcome {
                    notify_action: GameAction::Other(_),
                    ..
                },
                ..
            }
        ));
    }
}
