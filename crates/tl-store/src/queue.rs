//! Shared matchmaking state: sorted-set queues, matched-flag sets, and
//! short-TTL distributed locks. Modeled on a Redis-equivalent command
//! set so a production adapter can swap in a real `redis`/`deadpool`
//! client without changing `tl-matchmaking`.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Inserts or updates `member` in the sorted set `key` with `score`.
    async fn zadd(&self, key: &str, member: &str, score: i64) -> anyhow::Result<()>;
    /// Removes `member` from the sorted set `key`.
    async fn zrem(&self, key: &str, member: &str) -> anyhow::Result<()>;
    /// Returns up to `count` members with the lowest score, ascending.
    async fn zrange_oldest(&self, key: &str, count: usize) -> anyhow::Result<Vec<String>>;
    /// True if `member` is currently present in the sorted set `key`.
    async fn zismember(&self, key: &str, member: &str) -> anyhow::Result<bool>;

    /// Adds `member` to the plain set `key`.
    async fn sadd(&self, key: &str, member: &str) -> anyhow::Result<()>;
    /// Removes `member` from the plain set `key`.
    async fn srem(&self, key: &str, member: &str) -> anyhow::Result<()>;
    /// True if `member` is currently present in the plain set `key`.
    async fn sismember(&self, key: &str, member: &str) -> anyhow::Result<bool>;
    /// Atomically adds both members to the plain set `key` (single
    /// pipelined transaction), used to commit a confirmed pairing.
    async fn sadd_both(&self, key: &str, a: &str, b: &str) -> anyhow::Result<()>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> anyhow::Result<()>;
    async fn hget(&self, key: &str, field: &str) -> anyhow::Result<Option<String>>;

    /// `SET key NX EX ttl`: acquires a lock, returning `false` if it is
    /// already held.
    async fn lock_acquire(&self, key: &str, ttl: Duration) -> anyhow::Result<bool>;
    /// Releases a previously acquired lock. A no-op if expired already.
    async fn lock_release(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
struct State {
    sorted_sets: HashMap<String, HashMap<String, i64>>,
    sets: HashMap<String, std::collections::HashSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    locks: HashMap<String, Instant>,
}

/// In-process stand-in for a Redis-equivalent store, sufficient to
/// exercise matchmaking pairing logic without a live dependency.
#[derive(Default)]
pub struct InMemoryQueueStore {
    state: Mutex<State>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn zadd(&self, key: &str, member: &str, score: i64) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state
            .sorted_sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(set) = state.sorted_sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn zrange_oldest(&self, key: &str, count: usize) -> anyhow::Result<Vec<String>> {
        let state = self.state.lock().await;
        let mut entries: Vec<(&String, &i64)> = state
            .sorted_sets
            .get(key)
            .map(|set| set.iter().collect())
            .unwrap_or_default();
        entries.sort_by_key(|(_, score)| **score);
        Ok(entries.into_iter().take(count).map(|(m, _)| m.clone()).collect())
    }

    async fn zismember(&self, key: &str, member: &str) -> anyhow::Result<bool> {
        let state = self.state.lock().await;
        Ok(state
            .sorted_sets
            .get(key)
            .map(|set| set.contains_key(member))
            .unwrap_or(false))
    }

    async fn sadd(&self, key: &str, member: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.sets.entry(key.to_string()).or_default().insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(set) = state.sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn sismember(&self, key: &str, member: &str) -> anyhow::Result<bool> {
        let state = self.state.lock().await;
        Ok(state.sets.get(key).map(|s| s.contains(member)).unwrap_or(false))
    }

    async fn sadd_both(&self, key: &str, a: &str, b: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        let set = state.sets.entry(key.to_string()).or_default();
        set.insert(a.to_string());
        set.insert(b.to_string());
        Ok(())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> anyhow::Result<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn lock_acquire(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if let Some(expires_at) = state.locks.get(key) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        state.locks.insert(key.to_string(), now + ttl);
        Ok(true)
    }

    async fn lock_release(&self, key: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.locks.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zrange_oldest_returns_ascending_score_order() {
        let store = InMemoryQueueStore::new();
        store.zadd("ranked", "c", 300).await.unwrap();
        store.zadd("ranked", "a", 100).await.unwrap();
        store.zadd("ranked", "b", 200).await.unwrap();
        let oldest = store.zrange_oldest("ranked", 2).await.unwrap();
        assert_eq!(oldest, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn zrem_removes_member_from_future_ranges() {
        let store = InMemoryQueueStore::new();
        store.zadd("ranked", "a", 1).await.unwrap();
        store.zrem("ranked", "a").await.unwrap();
        assert!(!store.zismember("ranked", "a").await.unwrap());
    }

    #[tokio::test]
    async fn lock_acquire_is_exclusive_until_released() {
        let store = InMemoryQueueStore::new();
        assert!(store.lock_acquire("p:alice", Duration::from_secs(2)).await.unwrap());
        assert!(!store.lock_acquire("p:alice", Duration::from_secs(2)).await.unwrap());
        store.lock_release("p:alice").await.unwrap();
        assert!(store.lock_acquire("p:alice", Duration::from_secs(2)).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lock_can_be_reacquired() {
        let store = InMemoryQueueStore::new();
        assert!(store.lock_acquire("p:bob", Duration::from_millis(10)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.lock_acquire("p:bob", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn sadd_both_commits_pairing_atomically() {
        let store = InMemoryQueueStore::new();
        store.sadd_both("ranked:matched", "alice", "bob").await.unwrap();
        assert!(store.sismember("ranked:matched", "alice").await.unwrap());
        assert!(store.sismember("ranked:matched", "bob").await.unwrap());
    }
}
