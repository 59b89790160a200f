//! Who hears about an applied action, and what they read.

use indexmap::IndexSet;
use uuid::Uuid;

use crate::{
    services::scoring,
    state::{
        game::{Game, Player},
        state_machine::GameAction,
    },
};

/// Visible notification text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitledMessage {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub message: String,
}

/// Device-id audiences for one applied action. No device appears in both sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPlan {
    /// Text shown to `audience`; `None` sends nothing visible.
    pub titled: Option<TitledMessage>,
    /// Devices receiving the titled push.
    pub audience: IndexSet<String>,
    /// Devices receiving a silent refresh.
    pub silent_audience: IndexSet<String>,
}

impl NotificationPlan {
    /// Whether no device is addressed at all.
    pub fn is_empty(&self) -> bool {
        self.audience.is_empty() && self.silent_audience.is_empty()
    }
}

/// Build the plan for `action` applied to the committed `game`.
///
/// `acting_player_id` is the player named in the request, if any. Team-scoped actions
/// leave that player out of the titled audience; start and end of game reach everyone.
pub fn targets(
    game: &Game,
    action: &GameAction,
    acting_player_id: Option<Uuid>,
) -> NotificationPlan {
    let actor_device = acting_player_id
        .and_then(|id| game.player(id))
        .and_then(|player| player.device_id.clone());

    match action {
        GameAction::Create => NotificationPlan::default(),
        GameAction::StartGame => broadcast(
            game,
            TitledMessage {
                title: "Hunt Game has started!".into(),
                message: format!(
                    "Your hunt game has started! You have {}min to acquire all treasures - good luck and godspeed!",
                    game.duration_minutes
                ),
            },
        ),
        GameAction::EndGame => broadcast(game, end_message(game)),
        GameAction::JoinTeam(args) => {
            let (Some(team), Some(joiner)) = (game.team(args.team_id), game.player(args.player_id))
            else {
                return silent_for_everyone(game);
            };
            let titled = devices(team.players.iter().filter(|p| p.id != joiner.id));
            split(
                game,
                TitledMessage {
                    title: "New teammate :)".into(),
                    message: format!("{} has joined your team. You should say hello.", joiner.alias),
                },
                titled,
                actor_device,
            )
        }
        GameAction::LeaveTeam(args) => {
            let Some(team) = game.team(args.team_id) else {
                return silent_for_everyone(game);
            };
            split(
                game,
                TitledMessage {
                    title: "Someone left your team :(".into(),
                    message: format!(
                        "{} had to leave your team - they're sorry.",
                        args.player_alias
                    ),
                },
                devices(team.players.iter()),
                actor_device,
            )
        }
        GameAction::AcquireTreasure(args) => {
            let Some(team) = game.team(args.team_id) else {
                return silent_for_everyone(game);
            };
            let Some(acquired) = team.acquired_treasure(args.acquired_treasure_id) else {
                return silent_for_everyone(game);
            };
            let Some(treasure) = game.treasure(acquired.treasure_id) else {
                return silent_for_everyone(game);
            };
            let finder = game
                .player(acquired.player_id)
                .map(|player| player.alias.as_str())
                .unwrap_or("A teammate");
            let titled = devices(
                team.players
                    .iter()
                    .filter(|p| p.id != Some(acquired.player_id)),
            );
            split(
                game,
                TitledMessage {
                    title: format!("Treasure acquired for {} points!", treasure.points),
                    message: format!("{finder} just acquired the '{}' treasure", treasure.hint),
                },
                titled,
                actor_device,
            )
        }
        GameAction::AddTreasure(_) | GameAction::UpdatePlayer | GameAction::Other(_) => {
            silent_for_everyone(game)
        }
    }
}

fn end_message(game: &Game) -> TitledMessage {
    let winner = game
        .winning_team_id
        .and_then(|id| game.team(id))
        .map(|team| team.name.as_str());
    TitledMessage {
        title: "Your hunt game has ended".into(),
        message: match winner {
            Some(name) => format!("Game Over. Team {name} is the winner. Thanks for playing!"),
            None => "Game over. This game ended in a draw.".into(),
        },
    }
}

/// Result line used by the end-of-game audit event.
pub fn end_result(game: &Game) -> String {
    end_message(game).message
}

fn devices<'a>(players: impl Iterator<Item = &'a Player>) -> IndexSet<String> {
    players
        .filter_map(|player| player.device_id.clone())
        .collect()
}

fn all_devices(game: &Game) -> IndexSet<String> {
    devices(game.all_players())
}

/// Titled message to every device.
fn broadcast(game: &Game, message: TitledMessage) -> NotificationPlan {
    split(game, message, all_devices(game), None)
}

/// Titled message to `titled` minus the actor; every other device is silent.
fn split(
    game: &Game,
    message: TitledMessage,
    mut titled: IndexSet<String>,
    actor_device: Option<String>,
) -> NotificationPlan {
    if let Some(device) = &actor_device {
        titled.shift_remove(device);
    }
    let silent_audience = all_devices(game)
        .into_iter()
        .filter(|device| !titled.contains(device))
        .collect();
    NotificationPlan {
        titled: (!titled.is_empty()).then_some(message),
        audience: titled,
        silent_audience,
    }
}

fn silent_for_everyone(game: &Game) -> NotificationPlan {
    NotificationPlan {
        titled: None,
        audience: IndexSet::new(),
        silent_audience: all_devices(game),
    }
}

/// Final standings, highest first, for logs and events.
pub fn standings(game: &Game) -> String {
    scoring::rank(game)
        .iter()
        .map(|team| format!("{}={}", team.name, team.total_points()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        game::{AcquiredTreasure, AppMode, Team, Treasure},
        state_machine::{AcquireTreasureArgs, JoinTeamArgs, LeaveTeamArgs},
    };

    fn player(alias: &str, device: Option<&str>) -> Player {
        Player {
            id: Some(Uuid::new_v4()),
            alias: alias.into(),
            email: None,
            device_id: device.map(str::to_string),
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

    /// Red: ana(d-ana), bo(d-bo), cy(no device). Blue: dee(d-dee).
    fn game() -> Game {
        Game {
            id: Uuid::new_v4(),
            entry_code: Some("123456".into()),
            version_token: None,
            is_persisted: true,
            start_date: None,
            end_date: None,
            duration_minutes: 40,
            winning_team_id: None,
            teams: vec![
                team(
                    "Red",
                    vec![
                        player("ana", Some("d-ana")),
                        player("bo", Some("d-bo")),
                        player("cy", None),
                    ],
                ),
                team("Blue", vec![player("dee", Some("d-dee"))]),
            ],
            treasures: vec![Treasure {
                id: Uuid::new_v4(),
                hint: "old oak".into(),
                points: 10,
                image_source: None,
                attributes: Vec::new(),
            }],
            app_mode: AppMode::Dev,
        }
    }

    fn set(items: &[&str]) -> IndexSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn assert_disjoint(plan: &NotificationPlan) {
        assert!(plan.audience.is_disjoint(&plan.silent_audience));
    }

    #[test]
    fn start_game_reaches_every_device() {
        let game = game();
        let plan = targets(&game, &GameAction::StartGame, None);

        assert_eq!(plan.audience, set(&["d-ana", "d-bo", "d-dee"]));
        assert!(plan.silent_audience.is_empty());
        let titled = plan.titled.unwrap();
        assert_eq!(titled.title, "Hunt Game has started!");
        assert!(titled.message.contains("40min"));
    }

    #[test]
    fn start_and_end_reach_the_actor_too() {
        let game = game();
        let actor = game.teams[1].players[0].id;
        for action in [GameAction::StartGame, GameAction::EndGame] {
            let plan = targets(&game, &action, actor);

            assert_eq!(plan.audience, set(&["d-ana", "d-bo", "d-dee"]));
            assert!(plan.silent_audience.is_empty());
        }
    }

    #[test]
    fn end_game_names_the_winner() {
        let mut game = game();
        game.winning_team_id = Some(game.teams[1].id);
        let plan = targets(&game, &GameAction::EndGame, None);

        assert_eq!(plan.audience.len(), 3);
        assert_eq!(
            plan.titled.unwrap().message,
            "Game Over. Team Blue is the winner. Thanks for playing!"
        );
    }

    #[test]
    fn end_game_without_winner_is_a_draw() {
        let plan = targets(&game(), &GameAction::EndGame, None);
        assert_eq!(
            plan.titled.unwrap().message,
            "Game over. This game ended in a draw."
        );
    }

    #[test]
    fn join_team_skips_the_joiner() {
        let game = game();
        let joiner = game.teams[0].players[1].id.unwrap();
        let action = GameAction::JoinTeam(JoinTeamArgs {
            player_id: joiner,
            team_id: game.teams[0].id,
        });
        let plan = targets(&game, &action, Some(joiner));

        assert_eq!(plan.audience, set(&["d-ana"]));
        assert_eq!(plan.silent_audience, set(&["d-bo", "d-dee"]));
        assert_disjoint(&plan);
        assert!(plan.titled.unwrap().message.starts_with("bo has joined"));
    }

    #[test]
    fn lone_joiner_gets_no_titled_notification() {
        let game = game();
        let joiner = game.teams[1].players[0].id.unwrap();
        let action = GameAction::JoinTeam(JoinTeamArgs {
            player_id: joiner,
            team_id: game.teams[1].id,
        });
        let plan = targets(&game, &action, Some(joiner));

        assert!(plan.titled.is_none());
        assert!(plan.audience.is_empty());
        assert_eq!(plan.silent_audience, set(&["d-ana", "d-bo", "d-dee"]));
    }

    #[test]
    fn leave_team_notifies_remaining_members() {
        let mut game = game();
        game.teams[0].players.remove(0);
        let action = GameAction::LeaveTeam(LeaveTeamArgs {
            player_alias: "ana".into(),
            team_id: game.teams[0].id,
        });
        let plan = targets(&game, &action, None);

        assert_eq!(plan.audience, set(&["d-bo"]));
        assert_eq!(plan.silent_audience, set(&["d-dee"]));
        assert_eq!(plan.titled.unwrap().title, "Someone left your team :(");
    }

    #[test]
    fn acquisition_notifies_teammates_and_silences_the_finder() {
        let mut game = game();
        let finder = game.teams[0].players[0].id.unwrap();
        let acquisition = AcquiredTreasure {
            id: Uuid::new_v4(),
            treasure_id: game.treasures[0].id,
            player_id: finder,
            claimed_points: 7,
            image_source: None,
        };
        let action = GameAction::AcquireTreasure(AcquireTreasureArgs {
            team_id: game.teams[0].id,
            acquired_treasure_id: acquisition.id,
        });
        game.teams[0].acquired_treasures.push(acquisition);

        let plan = targets(&game, &action, Some(finder));

        assert_eq!(plan.audience, set(&["d-bo"]));
        assert_eq!(plan.silent_audience, set(&["d-ana", "d-dee"]));
        let titled = plan.titled.unwrap();
        assert_eq!(titled.title, "Treasure acquired for 10 points!");
        assert_eq!(titled.message, "ana just acquired the 'old oak' treasure");
    }

    #[test]
    fn informational_actions_are_silent_for_everyone() {
        let game = game();
        for action in [GameAction::UpdatePlayer, GameAction::Other("Rename".into())] {
            let plan = targets(&game, &action, None);
            assert!(plan.titled.is_none());
            assert!(plan.audience.is_empty());
            assert_eq!(plan.silent_audience, set(&["d-ana", "d-bo", "d-dee"]));
        }
    }

    #[test]
    fn creation_notifies_nobody() {
        assert!(targets(&game(), &GameAction::Create, None).is_empty());
    }
}
