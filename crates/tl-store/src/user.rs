//! Persistent per-player account record: rating, coin balance, and the
//! running career statistics settlement mutates.
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tl_core::{Elo, PlayerId};

/// A player's persisted account state, as `UserStore::get` returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub player_id: PlayerId,
    pub elo: Elo,
    pub avg_wpm: f64,
    pub coins: u64,
    pub total_matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub peak_elo: Elo,
    pub best_wpm: f64,
    pub rank_background: Option<String>,
}

impl UserRecord {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            elo: 1500,
            avg_wpm: 0.0,
            coins: 0,
            total_matches: 0,
            wins: 0,
            losses: 0,
            peak_elo: 1500,
            best_wpm: 0.0,
            rank_background: None,
        }
    }
}

/// A settlement-time patch to a player's career stats. `peak_elo` and
/// `best_wpm` are applied as running maxima, never overwritten downward.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsPatch {
    pub elo_delta: Elo,
    pub won: bool,
    pub lost: bool,
    pub match_wpm: f64,
    pub match_accuracy: f64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, player: &PlayerId) -> Option<UserRecord>;
    async fn add_coins(&self, player: &PlayerId, delta: u64) -> anyhow::Result<()>;
    async fn update_stats(&self, player: &PlayerId, patch: StatsPatch) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct InMemoryUserStore {
    records: RwLock<HashMap<PlayerId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: UserRecord) {
        self.records
            .write()
            .expect("user store lock poisoned")
            .insert(record.player_id.clone(), record);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, player: &PlayerId) -> Option<UserRecord> {
        self.records
            .read()
            .expect("user store lock poisoned")
            .get(player)
            .cloned()
    }

    async fn add_coins(&self, player: &PlayerId, delta: u64) -> anyhow::Result<()> {
        let mut records = self.records.write().expect("user store lock poisoned");
        let record = records
            .entry(player.clone())
            .or_insert_with(|| UserRecord::new(player.clone()));
        record.coins += delta;
        Ok(())
    }

    async fn update_stats(&self, player: &PlayerId, patch: StatsPatch) -> anyhow::Result<()> {
        let mut records = self.records.write().expect("user store lock poisoned");
        let record = records
            .entry(player.clone())
            .or_insert_with(|| UserRecord::new(player.clone()));
        record.elo = (record.elo + patch.elo_delta).max(0);
        record.total_matches += 1;
        if patch.won {
            record.wins += 1;
        }
        if patch.lost {
            record.losses += 1;
        }
        if patch.match_wpm > 0.0 {
            let n = record.total_matches as f64;
            record.avg_wpm = record.avg_wpm + (patch.match_wpm - record.avg_wpm) / n;
        }
        record.peak_elo = record.peak_elo.max(record.elo);
        record.best_wpm = record.best_wpm.max(patch.match_wpm);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerId {
        PlayerId("alice".to_string())
    }

    #[tokio::test]
    async fn unknown_player_returns_none() {
        let store = InMemoryUserStore::new();
        assert!(store.get(&player()).await.is_none());
    }

    #[tokio::test]
    async fn add_coins_creates_record_on_first_use() {
        let store = InMemoryUserStore::new();
        store.add_coins(&player(), 300).await.unwrap();
        assert_eq!(store.get(&player()).await.unwrap().coins, 300);
    }

    #[tokio::test]
    async fn update_stats_applies_elo_delta_and_floors_at_zero() {
        let store = InMemoryUserStore::new();
        store.seed(UserRecord {
            elo: 5,
            ..UserRecord::new(player())
        });
        store
            .update_stats(
                &player(),
                StatsPatch {
                    elo_delta: -50,
                    lost: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get(&player()).await.unwrap().elo, 0);
    }

    #[tokio::test]
    async fn peak_elo_and_best_wpm_never_decrease() {
        let store = InMemoryUserStore::new();
        store.seed(UserRecord {
            peak_elo: 2000,
            best_wpm: 90.0,
            elo: 1500,
            ..UserRecord::new(player())
        });
        store
            .update_stats(
                &player(),
                StatsPatch {
                    elo_delta: 10,
                    won: true,
                    match_wpm: 50.0,
                    match_accuracy: 95.0,
                },
            )
            .await
            .unwrap();
        let record = store.get(&player()).await.unwrap();
        assert_eq!(record.peak_elo, 2000);
        assert_eq!(record.best_wpm, 90.0);
    }

    #[tokio::test]
    async fn running_average_wpm_updates_across_matches() {
        let store = InMemoryUserStore::new();
        store
            .update_stats(
                &player(),
                StatsPatch {
                    match_wpm: 60.0,
                    won: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .update_stats(
                &player(),
                StatsPatch {
                    match_wpm: 80.0,
                    won: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let record = store.get(&player()).await.unwrap();
        assert_eq!(record.avg_wpm, 70.0);
    }
}
