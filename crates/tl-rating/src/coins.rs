//! Reward-coin computation: base reward plus rank and leaderboard bonuses.
use tl_core::{
    Outcome, Rank, LEADERBOARD_TOP10_BONUS_RATE, LEADERBOARD_TOP3_BONUS_RATE, LOSS_COIN_REWARD,
    WIN_COIN_REWARD,
};

/// Where a player currently sits on the leaderboard, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardStanding {
    OutOfRange,
    Top10,
    Top3,
}

impl LeaderboardStanding {
    pub fn from_position(position: Option<u32>) -> Self {
        match position {
            Some(p) if p <= 3 => Self::Top3,
            Some(p) if p <= 10 => Self::Top10,
            _ => Self::OutOfRange,
        }
    }

    fn bonus_rate(self) -> f64 {
        match self {
            Self::Top3 => LEADERBOARD_TOP3_BONUS_RATE,
            Self::Top10 => LEADERBOARD_TOP10_BONUS_RATE,
            Self::OutOfRange => 0.0,
        }
    }
}

/// Itemized coin reward for a single completed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinBreakdown {
    pub base: i64,
    pub rank_bonus: i64,
    pub leaderboard_bonus: i64,
    pub total: i64,
}

pub fn reward(outcome: Outcome, rank: Rank, standing: LeaderboardStanding) -> CoinBreakdown {
    let base = match outcome {
        Outcome::Win => WIN_COIN_REWARD,
        Outcome::Tie | Outcome::Loss => LOSS_COIN_REWARD,
    };
    let rank_bonus = (base as f64 * rank.coin_bonus_rate()).round() as i64;
    let leaderboard_bonus = (base as f64 * standing.bonus_rate()).round() as i64;
    CoinBreakdown {
        base,
        rank_bonus,
        leaderboard_bonus,
        total: base + rank_bonus + leaderboard_bonus,
    }
}
