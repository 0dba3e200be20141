//! Leaderboard standing lookups feeding the settlement coin-reward bonus.
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tl_core::{LEADERBOARD_TOP10_BONUS_RATE, LEADERBOARD_TOP3_BONUS_RATE, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderboardBonus {
    pub is_top3: bool,
    pub is_top10: bool,
    pub coin_bonus_rate: f64,
}

impl LeaderboardBonus {
    fn none() -> Self {
        Self {
            is_top3: false,
            is_top10: false,
            coin_bonus_rate: 0.0,
        }
    }

    fn top3() -> Self {
        Self {
            is_top3: true,
            is_top10: true,
            coin_bonus_rate: LEADERBOARD_TOP3_BONUS_RATE,
        }
    }

    fn top10() -> Self {
        Self {
            is_top3: false,
            is_top10: true,
            coin_bonus_rate: LEADERBOARD_TOP10_BONUS_RATE,
        }
    }
}

#[async_trait]
pub trait LeaderboardQuery: Send + Sync {
    async fn bonus_for(&self, player: &PlayerId) -> LeaderboardBonus;
}

/// Test double backed by an explicit rank assignment (1-based position).
#[derive(Default)]
pub struct InMemoryLeaderboard {
    positions: RwLock<HashMap<PlayerId, u32>>,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, player: PlayerId, position: u32) {
        self.positions
            .write()
            .expect("leaderboard lock poisoned")
            .insert(player, position);
    }
}

#[async_trait]
impl LeaderboardQuery for InMemoryLeaderboard {
    async fn bonus_for(&self, player: &PlayerId) -> LeaderboardBonus {
        match self
            .positions
            .read()
            .expect("leaderboard lock poisoned")
            .get(player)
            .copied()
        {
            Some(p) if p <= 3 => LeaderboardBonus::top3(),
            Some(p) if p <= 10 => LeaderboardBonus::top10(),
            _ => LeaderboardBonus::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unranked_player_gets_no_bonus() {
        let board = InMemoryLeaderboard::new();
        let bonus = board.bonus_for(&PlayerId("nobody".to_string())).await;
        assert_eq!(bonus, LeaderboardBonus::none());
    }

    #[tokio::test]
    async fn top_three_outranks_top_ten_bonus_rate() {
        let board = InMemoryLeaderboard::new();
        let alice = PlayerId("alice".to_string());
        let bob = PlayerId("bob".to_string());
        board.set_position(alice.clone(), 2);
        board.set_position(bob.clone(), 7);
        let alice_bonus = board.bonus_for(&alice).await;
        let bob_bonus = board.bonus_for(&bob).await;
        assert!(alice_bonus.is_top3);
        assert!(!bob_bonus.is_top3 && bob_bonus.is_top10);
        assert!(alice_bonus.coin_bonus_rate > bob_bonus.coin_bonus_rate);
    }
}
