//! Archival of completed matches, grounded in `original_source`'s
//! `_save_match_to_db` and the teacher's `Schema`-driven persistence
//! records (`rbp-database`/`rbp-pg`) — this crate defines the shape an
//! adapter would persist, without shipping a live Postgres adapter.
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tl_core::{Elo, MatchId, Millis, Mode, PlayerId};

/// Everything settlement persists about one finished match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub mode: Mode,
    pub player1: PlayerId,
    pub player2: Option<PlayerId>,
    pub player1_score: f64,
    pub player2_score: f64,
    pub player1_wpm: f64,
    pub player2_wpm: f64,
    pub player1_accuracy: f64,
    pub player2_accuracy: f64,
    pub player1_elo_delta: Elo,
    pub player2_elo_delta: Elo,
    pub duration_seconds: u32,
    pub created_at: Millis,
    pub ended_at: Millis,
    pub forfeit_by: Option<PlayerId>,
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Idempotent on `MatchId`: re-inserting the same match is a no-op.
    async fn insert(&self, record: MatchRecord) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct InMemoryMatchStore {
    records: RwLock<HashMap<MatchId, MatchRecord>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, match_id: &MatchId) -> Option<MatchRecord> {
        self.records
            .read()
            .expect("match store lock poisoned")
            .get(match_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("match store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn insert(&self, record: MatchRecord) -> anyhow::Result<()> {
        let mut records = self.records.write().expect("match store lock poisoned");
        records.entry(record.match_id).or_insert(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(match_id: MatchId) -> MatchRecord {
        MatchRecord {
            match_id,
            mode: Mode::Ranked,
            player1: PlayerId("alice".to_string()),
            player2: Some(PlayerId("bob".to_string())),
            player1_score: 1000.0,
            player2_score: 800.0,
            player1_wpm: 90.0,
            player2_wpm: 70.0,
            player1_accuracy: 98.0,
            player2_accuracy: 95.0,
            player1_elo_delta: 12,
            player2_elo_delta: -12,
            duration_seconds: 30,
            created_at: 0,
            ended_at: 30_000,
            forfeit_by: None,
        }
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let store = InMemoryMatchStore::new();
        let match_id = MatchId::default();
        store.insert(record(match_id)).await.unwrap();
        assert_eq!(store.get(&match_id).unwrap().player1_elo_delta, 12);
    }

    #[tokio::test]
    async fn insert_is_idempotent_on_match_id() {
        let store = InMemoryMatchStore::new();
        let match_id = MatchId::default();
        let mut first = record(match_id);
        first.player1_score = 1.0;
        let mut second = record(match_id);
        second.player1_score = 999.0;
        store.insert(first).await.unwrap();
        store.insert(second).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&match_id).unwrap().player1_score, 1.0);
    }
}
