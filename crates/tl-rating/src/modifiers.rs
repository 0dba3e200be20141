//! The ordered Elo-delta modifier pipeline applied on top of a raw
//! Glicko-2 delta, ported from
//! `original_source/models/elo.py::EloCalculator.calculate_match_result`.
use tl_core::{Elo, ELO_HARD_CAP, PLACEMENT_MATCH_THRESHOLD};

const STOMP_SCORE_DIFF: f64 = 5000.0;
const STOMP_MULTIPLIER: f64 = 1.5;
const PLACEMENT_MULTIPLIER: f64 = 2.5;
const BOT_HIGH_ELO_THRESHOLD: Elo = 3000;
const BOT_WIN_MULTIPLIER: f64 = 0.7;
const BOT_LOSS_MULTIPLIER: f64 = 0.8;
const BOT_HIGH_ELO_LOSS_MULTIPLIER: f64 = 2.0;
const BOT_HIGH_ELO_WIN_MULTIPLIER: f64 = 0.5;
const SOFT_CAP_ELO: Elo = 2500;
const SOFT_CAP_MULTIPLIER: f64 = 0.75;
const UNRANKED_PROTECTION_ELO: Elo = 1000;

/// Per-player context the modifier pipeline needs beyond the raw delta.
pub struct PlayerContext {
    pub elo: Elo,
    pub games_played: u32,
    pub score_diff: f64,
}

/// Applies the seven ordered modifiers to a raw Glicko-2 delta for one
/// side of a match and returns the final, capped, floor-respecting delta.
///
/// `is_bot_opponent` marks that the *other* side is a bot; a bot's own
/// delta is always forced to zero by the caller rather than through
/// this function, since a bot never owns a persisted rating.
pub fn apply(raw_delta: f64, ctx: &PlayerContext, is_bot_opponent: bool) -> Elo {
    let mut delta = raw_delta;

    if ctx.games_played < PLACEMENT_MATCH_THRESHOLD {
        delta *= PLACEMENT_MULTIPLIER;
    }

    if delta > 0.0 && ctx.score_diff.abs() > STOMP_SCORE_DIFF {
        delta *= STOMP_MULTIPLIER;
    }

    if is_bot_opponent {
        if ctx.elo > BOT_HIGH_ELO_THRESHOLD && delta < 0.0 {
            delta *= BOT_HIGH_ELO_LOSS_MULTIPLIER;
        } else if ctx.elo > BOT_HIGH_ELO_THRESHOLD && delta > 0.0 {
            delta *= BOT_HIGH_ELO_WIN_MULTIPLIER;
        } else if delta > 0.0 {
            delta *= BOT_WIN_MULTIPLIER;
        } else {
            delta *= BOT_LOSS_MULTIPLIER;
        }
    }

    if ctx.elo > SOFT_CAP_ELO && delta > 0.0 {
        delta *= SOFT_CAP_MULTIPLIER;
    }

    if ctx.elo < UNRANKED_PROTECTION_ELO && delta < 0.0 {
        delta = 0.0;
    }

    delta = delta.clamp(-(ELO_HARD_CAP as f64), ELO_HARD_CAP as f64);

    let floor_adjusted = if ctx.elo as f64 + delta < 0.0 {
        -(ctx.elo as f64)
    } else {
        delta
    };

    floor_adjusted.round() as Elo
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(elo: Elo, games_played: u32, score_diff: f64) -> PlayerContext {
        PlayerContext {
            elo,
            games_played,
            score_diff,
        }
    }

    #[test]
    fn placement_bonus_multiplies_positive_delta() {
        let c = ctx(1500, 3, 100.0);
        let with_bonus = apply(10.0, &c, false);
        let without_bonus = apply(10.0, &ctx(1500, 20, 100.0), false);
        assert!(with_bonus > without_bonus);
    }

    #[test]
    fn stomp_bonus_only_applies_to_positive_delta() {
        let c = ctx(1500, 20, 6000.0);
        assert!(apply(10.0, &c, false) > 10);
        assert_eq!(apply(-10.0, &c, false), -10);
    }

    #[test]
    fn bot_high_elo_loss_doubles_and_win_is_halved() {
        let high = ctx(3500, 20, 100.0);
        assert_eq!(apply(-10.0, &high, true), -20);
        assert_eq!(apply(10.0, &high, true), 5);
    }

    #[test]
    fn bot_normal_elo_dampens_both_directions() {
        let normal = ctx(1500, 20, 100.0);
        assert_eq!(apply(10.0, &normal, true), 7);
        assert_eq!(apply(-10.0, &normal, true), -8);
    }

    #[test]
    fn high_rank_soft_cap_shrinks_gains_only() {
        let high = ctx(2600, 20, 100.0);
        assert_eq!(apply(100.0, &high, false), 75);
        assert_eq!(apply(-100.0, &high, false), -100);
    }

    #[test]
    fn unranked_protection_clamps_losses_to_zero() {
        let low = ctx(980, 20, 100.0);
        assert_eq!(apply(-18.0, &low, false), 0);
    }

    #[test]
    fn hard_cap_bounds_delta_to_plus_minus_100() {
        let c = ctx(1500, 20, 10000.0);
        assert_eq!(apply(500.0, &c, false), ELO_HARD_CAP);
        assert_eq!(apply(-500.0, &c, false), -ELO_HARD_CAP);
    }

    #[test]
    fn elo_floor_never_goes_negative() {
        let near_zero = ctx(15, 20, 100.0);
        let delta = apply(-40.0, &near_zero, false);
        assert_eq!(near_zero.elo as f64 + delta as f64, 0.0);
    }
}
