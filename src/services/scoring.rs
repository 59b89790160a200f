//! Pure scoring helpers: completion check, ranking and winner resolution.

use std::collections::HashSet;

use serde::Deserialize;
use uuid::Uuid;

use crate::state::game::{Game, Team};

/// Condition under which an acquisition ends the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionRule {
    /// The acting team holds an acquisition for every treasure of the game.
    #[default]
    AllTreasures,
    /// The acting team reached at least `points`.
    PointThreshold {
        /// Total to reach.
        points: u32,
    },
}

/// Result of evaluating an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// The acting team satisfies the rule and the game ends.
    pub is_winning_move: bool,
}

/// Check whether `acting_team_id` satisfies the completion rule on this snapshot.
///
/// The snapshot is expected to already contain the acquisition being evaluated.
pub fn evaluate(game: &Game, acting_team_id: Uuid, rule: &CompletionRule) -> Evaluation {
    let Some(team) = game.team(acting_team_id) else {
        return Evaluation {
            is_winning_move: false,
        };
    };

    let is_winning_move = match rule {
        CompletionRule::AllTreasures => {
            let acquired = team
                .acquired_treasures
                .iter()
                .map(|acquired| acquired.treasure_id)
                .collect::<HashSet<_>>();
            !game.treasures.is_empty()
                && game
                    .treasures
                    .iter()
                    .all(|treasure| acquired.contains(&treasure.id))
        }
        CompletionRule::PointThreshold { points } => team.total_points() >= u64::from(*points),
    };

    Evaluation { is_winning_move }
}

/// Teams ordered by total points, highest first. Equal scores keep their snapshot order.
pub fn rank(game: &Game) -> Vec<&Team> {
    let mut teams = game.teams.iter().collect::<Vec<_>>();
    teams.sort_by(|a, b| b.total_points().cmp(&a.total_points()));
    teams
}

/// Winner of a ranked list, or `None` for a draw.
///
/// Only an exact tie between the top two scores is a draw. A single team wins by default
/// and an empty game is a draw.
pub fn resolve_winner(ranked: &[&Team]) -> Option<Uuid> {
    match ranked {
        [] => None,
        [only] => Some(only.id),
        [first, second, ..] if first.total_points() == second.total_points() => None,
        [first, ..] => Some(first.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::{AcquiredTreasure, AppMode, Treasure};

    fn team_with(points: &[u32]) -> Team {
        Team {
            id: Uuid::new_v4(),
            name: format!("team-{}", points.len()),
            players: Vec::new(),
            acquired_treasures: points
                .iter()
                .map(|points| AcquiredTreasure {
                    id: Uuid::new_v4(),
                    treasure_id: Uuid::new_v4(),
                    player_id: Uuid::new_v4(),
                    claimed_points: *points,
                    image_source: None,
                })
                .collect(),
        }
    }

    fn game_with(teams: Vec<Team>, treasures: Vec<Treasure>) -> Game {
        Game {
            id: Uuid::new_v4(),
            entry_code: None,
            version_token: None,
            is_persisted: true,
            start_date: None,
            end_date: None,
            duration_minutes: 30,
            winning_team_id: None,
            teams,
            treasures,
            app_mode: AppMode::Production,
        }
    }

    fn treasure(points: u32) -> Treasure {
        Treasure {
            id: Uuid::new_v4(),
            hint: "under the bridge".into(),
            points,
            image_source: None,
            attributes: Vec::new(),
        }
    }

    #[test]
    fn tie_at_the_top_is_a_draw() {
        let game = game_with(vec![team_with(&[10]), team_with(&[5, 5])], Vec::new());
        assert_eq!(resolve_winner(&rank(&game)), None);
    }

    #[test]
    fn highest_score_wins() {
        let low = team_with(&[10]);
        let high = team_with(&[10, 5]);
        let high_id = high.id;
        let game = game_with(vec![low, high], Vec::new());
        assert_eq!(resolve_winner(&rank(&game)), Some(high_id));
    }

    #[test]
    fn tie_below_the_top_does_not_matter() {
        let top = team_with(&[20]);
        let top_id = top.id;
        let game = game_with(
            vec![team_with(&[3]), top, team_with(&[3])],
            Vec::new(),
        );
        assert_eq!(resolve_winner(&rank(&game)), Some(top_id));
    }

    #[test]
    fn huge_claims_rank_without_wrapping() {
        let big = team_with(&[u32::MAX, 10]);
        let big_id = big.id;
        let game = game_with(vec![team_with(&[u32::MAX]), big], Vec::new());

        assert_eq!(resolve_winner(&rank(&game)), Some(big_id));
        assert!(
            evaluate(
                &game,
                big_id,
                &CompletionRule::PointThreshold { points: u32::MAX }
            )
            .is_winning_move
        );
    }

    #[test]
    fn degenerate_team_counts() {
        let solo = team_with(&[]);
        let solo_id = solo.id;
        assert_eq!(resolve_winner(&rank(&game_with(vec![solo], Vec::new()))), Some(solo_id));
        assert_eq!(resolve_winner(&rank(&game_with(Vec::new(), Vec::new()))), None);
    }

    #[test]
    fn all_treasures_rule_requires_every_treasure() {
        let first = treasure(10);
        let second = treasure(5);
        let mut team = team_with(&[]);
        team.acquired_treasures.push(AcquiredTreasure {
            id: Uuid::new_v4(),
            treasure_id: first.id,
            player_id: Uuid::new_v4(),
            claimed_points: 10,
            image_source: None,
        });
        let team_id = team.id;
        let mut game = game_with(vec![team], vec![first, second.clone()]);

        assert!(!evaluate(&game, team_id, &CompletionRule::AllTreasures).is_winning_move);

        game.teams[0].acquired_treasures.push(AcquiredTreasure {
            id: Uuid::new_v4(),
            treasure_id: second.id,
            player_id: Uuid::new_v4(),
            claimed_points: 5,
            image_source: None,
        });
        assert!(evaluate(&game, team_id, &CompletionRule::AllTreasures).is_winning_move);
    }

    #[test]
    fn all_treasures_rule_never_fires_without_treasures() {
        let team = team_with(&[]);
        let team_id = team.id;
        let game = game_with(vec![team], Vec::new());
        assert!(!evaluate(&game, team_id, &CompletionRule::AllTreasures).is_winning_move);
    }

    #[test]
    fn point_threshold_rule() {
        let team = team_with(&[10, 15]);
        let team_id = team.id;
        let game = game_with(vec![team], Vec::new());

        assert!(
            evaluate(&game, team_id, &CompletionRule::PointThreshold { points: 25 })
                .is_winning_move
        );
        assert!(
            !evaluate(&game, team_id, &CompletionRule::PointThreshold { points: 26 })
                .is_winning_move
        );
    }

    #[test]
    fn unknown_team_never_wins() {
        let game = game_with(vec![team_with(&[100])], vec![treasure(1)]);
        assert!(
            !evaluate(&game, Uuid::new_v4(), &CompletionRule::PointThreshold { points: 0 })
                .is_winning_move
        );
    }
}
