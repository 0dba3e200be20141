//! Glicko-2 rating updates and reward-coin computation for completed
//! typing-race matches, ported from `original_source/models/elo.py`.
pub mod coins;
pub mod glicko2;
pub mod modifiers;

pub use coins::{reward, CoinBreakdown, LeaderboardStanding};
pub use glicko2::Rating;

use modifiers::PlayerContext;
use tl_core::{Elo, Mode, Outcome};

/// One side of a completed match, as seen by the rating engine.
pub struct MatchParticipant {
    pub rating: Rating,
    pub games_played: u32,
    pub score: f64,
}

/// Result of settling a match: each side's Elo delta plus the
/// requesting player's outcome.
pub struct SettledMatch {
    pub player_delta: Elo,
    pub opponent_delta: Elo,
    pub player_outcome: Outcome,
}

fn outcome_for(own_score: f64, opponent_score: f64) -> Outcome {
    if own_score > opponent_score {
        Outcome::Win
    } else if own_score < opponent_score {
        Outcome::Loss
    } else {
        Outcome::Tie
    }
}

/// Settles one completed match and returns both sides' Elo deltas.
///
/// Training-mode and friends-mode matches skip the Glicko-2 pipeline
/// entirely: both deltas are always zero. A bot opponent never owns a
/// persisted rating, so its delta is forced to zero regardless of mode.
pub fn settle(
    mode: Mode,
    player: &MatchParticipant,
    opponent: &MatchParticipant,
    opponent_is_bot: bool,
) -> SettledMatch {
    let player_outcome = outcome_for(player.score, opponent.score);

    if !mode.affects_rating() {
        return SettledMatch {
            player_delta: 0,
            opponent_delta: 0,
            player_outcome,
        };
    }

    let player_score = glicko2::outcome_score(player.score, opponent.score);
    let opponent_score = glicko2::outcome_score(opponent.score, player.score);

    let player_updated = glicko2::update(
        player.rating,
        opponent.rating.mu(),
        opponent.rating.phi(),
        player_score,
    );
    let opponent_updated = glicko2::update(
        opponent.rating,
        player.rating.mu(),
        player.rating.phi(),
        opponent_score,
    );

    let raw_player_delta = (player_updated.elo - player.rating.elo) as f64;
    let raw_opponent_delta = (opponent_updated.elo - opponent.rating.elo) as f64;
    let score_diff = player.score - opponent.score;

    let player_delta = modifiers::apply(
        raw_player_delta,
        &PlayerContext {
            elo: player.rating.elo,
            games_played: player.games_played,
            score_diff,
        },
        opponent_is_bot,
    );

    let opponent_delta = if opponent_is_bot {
        0
    } else {
        modifiers::apply(
            raw_opponent_delta,
            &PlayerContext {
                elo: opponent.rating.elo,
                games_played: opponent.games_played,
                score_diff: -score_diff,
            },
            false,
        )
    };

    SettledMatch {
        player_delta,
        opponent_delta,
        player_outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(elo: Elo, games_played: u32, score: f64) -> MatchParticipant {
        MatchParticipant {
            rating: Rating::new(elo),
            games_played,
            score,
        }
    }

    #[test]
    fn training_mode_always_zeroes_both_deltas() {
        let a = participant(1500, 20, 200.0);
        let b = participant(1500, 20, 50.0);
        let settled = settle(Mode::Training, &a, &b, false);
        assert_eq!(settled.player_delta, 0);
        assert_eq!(settled.opponent_delta, 0);
        assert_eq!(settled.player_outcome, Outcome::Win);
    }

    #[test]
    fn friends_mode_always_zeroes_both_deltas() {
        let a = participant(1500, 20, 10.0);
        let b = participant(1500, 20, 90.0);
        let settled = settle(Mode::Friends, &a, &b, false);
        assert_eq!(settled.player_delta, 0);
        assert_eq!(settled.opponent_delta, 0);
        assert_eq!(settled.player_outcome, Outcome::Loss);
    }

    #[test]
    fn ranked_win_gains_elo_and_loss_loses_it() {
        let a = participant(1500, 20, 300.0);
        let b = participant(1500, 20, 100.0);
        let settled = settle(Mode::Ranked, &a, &b, false);
        assert!(settled.player_delta > 0);
        assert!(settled.opponent_delta < 0);
        assert_eq!(settled.player_outcome, Outcome::Win);
    }

    #[test]
    fn bot_opponent_delta_is_always_zero() {
        let a = participant(1500, 20, 300.0);
        let bot = participant(1500, 999, 100.0);
        let settled = settle(Mode::Ranked, &a, &bot, true);
        assert_eq!(settled.opponent_delta, 0);
        assert!(settled.player_delta != 0);
    }

    #[test]
    fn deltas_never_exceed_hard_cap_magnitude() {
        let a = participant(1500, 1, 50000.0);
        let b = participant(800, 1, 1.0);
        let settled = settle(Mode::Ranked, &a, &b, false);
        assert!(settled.player_delta.abs() <= tl_core::ELO_HARD_CAP);
        assert!(settled.opponent_delta.abs() <= tl_core::ELO_HARD_CAP);
    }

    #[test]
    fn unranked_protection_keeps_low_elo_player_from_dropping_below_zero() {
        let low = participant(980, 20, 50.0);
        let strong = participant(2800, 20, 400.0);
        let settled = settle(Mode::Ranked, &low, &strong, false);
        assert!(low.rating.elo + settled.player_delta >= 0);
    }
}
