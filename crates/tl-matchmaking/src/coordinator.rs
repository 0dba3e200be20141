//! The three-queue pairing engine: enqueue, the per-player search task,
//! FIFO-with-mutual-lock pairing, and bot fallback. Ported from
//! `original_source/services/matchmaking.py::MatchmakingService`.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, OnceCell};

use tl_core::{
    MatchId, Mode, PlayerId, PAIRING_CANDIDATE_WINDOW, PAIRING_LOCK_TTL_SECS,
    RANKED_MATCHMAKING_TIMEOUT_SECS, SEARCH_TICK_SECS, TRAINING_MATCHMAKING_TIMEOUT_SECS,
};
use tl_store::{AuditEvent, AuditSink, QueueStore};

use crate::entry::QueueEntry;
use crate::pending::{OrchestratorPort, PendingMatch};

const MATCHED_CALLBACK_TIMEOUT: Duration = Duration::from_secs(tl_core::MATCHED_CALLBACK_TIMEOUT_SECS);

/// Per-player pairing notification, registered at `enqueue` and fired
/// once (by this player's own `tryPair` success, or by the opponent's
/// `createMatch`) when a pairing is confirmed.
#[async_trait]
pub trait PairingSink: Send + Sync {
    async fn on_match_found(&self, pending: &PendingMatch, words: &[String]);
    async fn on_queue_update(&self, position: u32, elapsed_seconds: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// `JOIN_FRIENDS_QUEUE` with an empty friend set; rejected before
    /// any queue I/O, per `original_source/services/matchmaking.py`.
    NoFriends,
    /// The invariant "a `PlayerId` is in at most one queue at any time"
    /// would be violated by this enrolment.
    AlreadyQueued,
}

struct Registration {
    callback: Arc<dyn PairingSink>,
    paired: Arc<Notify>,
}

fn queue_key(mode: Mode) -> String {
    format!("queue:{mode}")
}
fn matched_key(mode: Mode) -> String {
    format!("matched:{mode}")
}
fn lock_key(player: &PlayerId) -> String {
    format!("lock:player:{player}")
}
fn entries_key(mode: Mode) -> &'static str {
    match mode {
        Mode::Ranked => "entries:ranked",
        Mode::Training => "entries:training",
        Mode::Friends => "entries:friends",
    }
}
fn friends_list_key() -> &'static str {
    "friends:list"
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs() as i64
}

fn mode_timeout_secs(mode: Mode) -> u64 {
    match mode {
        Mode::Ranked => RANKED_MATCHMAKING_TIMEOUT_SECS,
        Mode::Training => TRAINING_MATCHMAKING_TIMEOUT_SECS,
        // Friends mode never falls back to a bot; this value is never consulted.
        Mode::Friends => u64::MAX,
    }
}

/// The matchmaking coordinator: three logically identical queues
/// (ranked, training, friends), a shared matched-set per queue, and
/// short-TTL distributed locks serializing opponent selection.
///
/// Generic over neither store nor orchestrator — both are held as trait
/// objects so `tl-server` can wire concrete implementations (a real
/// Redis-equivalent, the live `MatchOrchestrator`) without this crate
/// needing to name either concrete type.
pub struct MatchmakingCoordinator {
    store: Arc<dyn QueueStore>,
    audit: Arc<dyn AuditSink>,
    /// Set once, after construction, by whoever wires this coordinator to
    /// a live `MatchOrchestrator` — the two are mutually referential at
    /// the trait-object level, so direct construction-time injection
    /// would require a cycle.
    orchestrator: OnceCell<Arc<dyn OrchestratorPort>>,
    registrations: Mutex<HashMap<PlayerId, Registration>>,
}

impl MatchmakingCoordinator {
    /// `friend_ids` passed to [`Self::enqueue`] is expected to already
    /// come from the caller's own `FriendGraph` lookup (`tl-server`
    /// resolves it once, at enqueue time) — the coordinator itself
    /// only persists and re-reads that snapshot, so it has no direct
    /// `FriendGraph` dependency of its own.
    pub fn new(store: Arc<dyn QueueStore>, audit: Arc<dyn AuditSink>) -> Arc<Self> {
        Arc::new(Self {
            store,
            audit,
            orchestrator: OnceCell::new(),
            registrations: Mutex::new(HashMap::new()),
        })
    }

    /// Wires the orchestrator this coordinator hands confirmed pairings
    /// to. Must be called exactly once, before the first `enqueue`.
    pub fn set_orchestrator(&self, orchestrator: Arc<dyn OrchestratorPort>) {
        self.orchestrator
            .set(orchestrator)
            .unwrap_or_else(|_| panic!("orchestrator already wired"));
    }

    fn orchestrator(&self) -> Arc<dyn OrchestratorPort> {
        self.orchestrator
            .get()
            .expect("orchestrator must be wired before matchmaking starts")
            .clone()
    }

    /// Enrols `player` in `mode`'s queue and spawns its search task.
    /// `friend_ids` is only consulted (and only required non-empty) for
    /// `Mode::Friends`; it is persisted in the shared store so friends
    /// pairing stays correct across replicas, not just within this
    /// process (see SPEC_FULL.md §9 resolution of the friends-mode
    /// redesign flag).
    pub async fn enqueue(
        self: &Arc<Self>,
        mut entry: QueueEntry,
        mode: Mode,
        friend_ids: Vec<PlayerId>,
        callback: Arc<dyn PairingSink>,
    ) -> Result<(), EnqueueError> {
        if mode == Mode::Friends && friend_ids.is_empty() {
            return Err(EnqueueError::NoFriends);
        }

        for other in [Mode::Ranked, Mode::Training, Mode::Friends] {
            if other != mode
                && self
                    .store
                    .zismember(&queue_key(other), entry.player_id.0.as_str())
                    .await
                    .unwrap_or(false)
            {
                return Err(EnqueueError::AlreadyQueued);
            }
        }

        // Step 1: remove from the mode's matched set (idempotent).
        let _ = self.store.srem(&matched_key(mode), &entry.player_id.0).await;

        if mode == Mode::Friends {
            let json = serde_json::to_string(&friend_ids).unwrap_or_default();
            let _ = self.store.hset(friends_list_key(), &entry.player_id.0, &json).await;
        }

        entry.joined_at = now_secs();
        // Step 2: insert into the ordered queue, score = monotonic join time.
        let _ = self
            .store
            .zadd(&queue_key(mode), &entry.player_id.0, entry.joined_at)
            .await;
        let _ = self
            .store
            .hset(entries_key(mode), &entry.player_id.0, &entry.to_json())
            .await;

        // Step 3: register callback locally.
        let mut registrations = self.registrations.lock().await;
        registrations.insert(
            entry.player_id.clone(),
            Registration {
                callback,
                paired: Arc::new(Notify::new()),
            },
        );
        drop(registrations);

        // Step 4: spawn the search task for this player.
        let coordinator = Arc::clone(self);
        let player = entry.player_id.clone();
        tokio::spawn(async move {
            coordinator.search_task(player, mode).await;
        });
        Ok(())
    }

    /// Cancels a player's enrolment. The search task observes the
    /// player vanishing from the queue on its next tick and exits.
    pub async fn leave_queue(&self, player: &PlayerId, mode: Mode) -> anyhow::Result<()> {
        self.store.zrem(&queue_key(mode), &player.0).await?;
        self.registrations.lock().await.remove(player);
        Ok(())
    }

    async fn search_task(self: Arc<Self>, player: PlayerId, mode: Mode) {
        let started = now_secs();
        loop {
            tokio::time::sleep(Duration::from_secs(SEARCH_TICK_SECS)).await;

            let still_queued = self
                .store
                .zismember(&queue_key(mode), &player.0)
                .await
                .unwrap_or(false);
            if !still_queued {
                log::debug!("matchmaking: {player} left {mode} queue, search task exiting");
                return;
            }

            let already_matched = self
                .store
                .sismember(&matched_key(mode), &player.0)
                .await
                .unwrap_or(false);
            if already_matched {
                let notify = {
                    let registrations = self.registrations.lock().await;
                    registrations.get(&player).map(|r| r.paired.clone())
                };
                if let Some(notify) = notify {
                    if tokio::time::timeout(MATCHED_CALLBACK_TIMEOUT, notify.notified())
                        .await
                        .is_err()
                    {
                        log::warn!("matchmaking: {player}'s pairing callback never fired, clearing matched flag");
                        let _ = self.store.srem(&matched_key(mode), &player.0).await;
                    }
                }
                return;
            }

            let elapsed = (now_secs() - started).max(0) as u64;
            self.send_queue_update(&player, elapsed).await;

            if mode.allows_bot_fallback() && elapsed >= mode_timeout_secs(mode) {
                if self.try_create_bot_match(&player, mode).await {
                    return;
                }
            } else if self.try_pair(&player, mode).await {
                return;
            }
        }
    }

    async fn send_queue_update(&self, player: &PlayerId, elapsed_seconds: u64) {
        let registrations = self.registrations.lock().await;
        if let Some(reg) = registrations.get(player) {
            // Position is an inexpensive approximation (rank within the
            // oldest window) rather than an exact O(1) store primitive;
            // acceptable for a ~1 Hz cosmetic tick.
            let callback = reg.callback.clone();
            drop(registrations);
            callback.on_queue_update(1, elapsed_seconds).await;
        }
    }

    /// FIFO pairing under mutual short-TTL locks (SPEC_FULL.md §4.5).
    async fn try_pair(&self, player: &PlayerId, mode: Mode) -> bool {
        if !self
            .store
            .lock_acquire(&lock_key(player), Duration::from_secs(PAIRING_LOCK_TTL_SECS))
            .await
            .unwrap_or(false)
        {
            return false;
        }

        let result = self.try_pair_locked(player, mode).await;
        self.store.lock_release(&lock_key(player)).await.ok();
        result
    }

    async fn try_pair_locked(&self, player: &PlayerId, mode: Mode) -> bool {
        let candidates = self
            .store
            .zrange_oldest(&queue_key(mode), PAIRING_CANDIDATE_WINDOW + 1)
            .await
            .unwrap_or_default();

        let caller_friends: Vec<PlayerId> = if mode == Mode::Friends {
            self.load_friend_list(player).await
        } else {
            Vec::new()
        };

        for candidate in candidates {
            if candidate == player.0 {
                continue;
            }
            let candidate_id = PlayerId::from(candidate.as_str());

            let still_queued = self.store.zismember(&queue_key(mode), &candidate).await.unwrap_or(false);
            let unmatched = !self.store.sismember(&matched_key(mode), &candidate).await.unwrap_or(true);
            if !still_queued || !unmatched {
                continue;
            }
            if mode == Mode::Friends && !caller_friends.contains(&candidate_id) {
                continue;
            }

            if !self
                .store
                .lock_acquire(&lock_key(&candidate_id), Duration::from_secs(PAIRING_LOCK_TTL_SECS))
                .await
                .unwrap_or(false)
            {
                continue;
            }

            let still_valid = self.store.zismember(&queue_key(mode), &candidate).await.unwrap_or(false)
                && !self.store.sismember(&matched_key(mode), &candidate).await.unwrap_or(true);
            if !still_valid {
                self.store.lock_release(&lock_key(&candidate_id)).await.ok();
                continue;
            }

            let _ = self.store.sadd_both(&matched_key(mode), &player.0, &candidate).await;
            self.store.lock_release(&lock_key(&candidate_id)).await.ok();

            self.create_match(player, &candidate_id, mode).await;
            return true;
        }
        false
    }

    async fn load_friend_list(&self, player: &PlayerId) -> Vec<PlayerId> {
        self.store
            .hget(friends_list_key(), &player.0)
            .await
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str::<Vec<PlayerId>>(&raw).ok())
            .unwrap_or_default()
    }

    async fn load_entry(&self, mode: Mode, player: &PlayerId) -> Option<QueueEntry> {
        self.store
            .hget(entries_key(mode), &player.0)
            .await
            .ok()
            .flatten()
            .and_then(|raw| QueueEntry::from_json(&raw))
    }

    async fn create_match(&self, player: &PlayerId, opponent: &PlayerId, mode: Mode) {
        let (Some(player_entry), Some(opponent_entry)) = (
            self.load_entry(mode, player).await,
            self.load_entry(mode, opponent).await,
        ) else {
            log::error!("matchmaking: lost queue entry data pairing {player} vs {opponent}");
            return;
        };

        let _ = self.store.zrem(&queue_key(mode), &player.0).await;
        let _ = self.store.zrem(&queue_key(mode), &opponent.0).await;

        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: player_entry,
            player2: Some(opponent_entry),
            mode,
            is_bot: false,
        };

        let words = self.orchestrator().accept(pending.clone()).await;

        self.notify_pairing(player, &pending, &words).await;
        self.notify_pairing(opponent, &pending, &words).await;
    }

    async fn notify_pairing(&self, player: &PlayerId, pending: &PendingMatch, words: &[String]) {
        let (callback, paired) = {
            let registrations = self.registrations.lock().await;
            match registrations.get(player) {
                Some(reg) => (reg.callback.clone(), reg.paired.clone()),
                None => {
                    log::warn!("matchmaking: no registered callback for {player} at pairing time");
                    return;
                }
            }
        };
        callback.on_match_found(pending, words).await;
        paired.notify_one();
    }

    async fn try_create_bot_match(&self, player: &PlayerId, mode: Mode) -> bool {
        if !self
            .store
            .lock_acquire(&lock_key(player), Duration::from_secs(PAIRING_LOCK_TTL_SECS))
            .await
            .unwrap_or(false)
        {
            return false;
        }

        let still_valid = self.store.zismember(&queue_key(mode), &player.0).await.unwrap_or(false)
            && !self.store.sismember(&matched_key(mode), &player.0).await.unwrap_or(true);
        if !still_valid {
            self.store.lock_release(&lock_key(player)).await.ok();
            return false;
        }

        let _ = self.store.sadd(&matched_key(mode), &player.0).await;
        let Some(entry) = self.load_entry(mode, player).await else {
            self.store.lock_release(&lock_key(player)).await.ok();
            return false;
        };
        let _ = self.store.zrem(&queue_key(mode), &player.0).await;
        self.store.lock_release(&lock_key(player)).await.ok();

        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: entry,
            player2: None,
            mode,
            is_bot: true,
        };
        let words = self.orchestrator().accept(pending.clone()).await;
        self.notify_pairing(player, &pending, &words).await;
        true
    }

    /// Called by `MatchOrchestrator` at settlement: removes both sides
    /// from `mode`'s matched set, plus a friends-matched cross-mode
    /// safety sweep regardless of which mode this match was.
    pub async fn cleanup_after_match(&self, p1: &PlayerId, p2: Option<&PlayerId>, mode: Mode) {
        let _ = self.store.srem(&matched_key(mode), &p1.0).await;
        let _ = self.store.srem(&matched_key(Mode::Friends), &p1.0).await;
        if let Some(p2) = p2 {
            let _ = self.store.srem(&matched_key(mode), &p2.0).await;
            let _ = self.store.srem(&matched_key(Mode::Friends), &p2.0).await;
        }
        self.audit
            .log(AuditEvent::ForfeitDeclared {
                match_id: tl_core::MatchId::default(),
                player: p1.clone(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_store::{InMemoryQueueStore, LoggingAuditSink};

    struct RecordingSink {
        found: Mutex<Vec<PendingMatch>>,
        updates: Mutex<Vec<(u32, u64)>>,
    }
    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                found: Mutex::new(Vec::new()),
                updates: Mutex::new(Vec::new()),
            })
        }
    }
    #[async_trait]
    impl PairingSink for RecordingSink {
        async fn on_match_found(&self, pending: &PendingMatch, _words: &[String]) {
            self.found.lock().await.push(pending.clone());
        }
        async fn on_queue_update(&self, position: u32, elapsed_seconds: u64) {
            self.updates.lock().await.push((position, elapsed_seconds));
        }
    }

    struct RecordingOrchestrator {
        accepted: Mutex<Vec<PendingMatch>>,
    }
    impl RecordingOrchestrator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                accepted: Mutex::new(Vec::new()),
            })
        }
    }
    #[async_trait]
    impl OrchestratorPort for RecordingOrchestrator {
        async fn accept(&self, pending: PendingMatch) -> Vec<String> {
            self.accepted.lock().await.push(pending);
            vec!["the".to_string(), "quick".to_string(), "fox".to_string()]
        }
    }

    fn entry(id: &str, elo: tl_core::Elo) -> QueueEntry {
        QueueEntry {
            player_id: PlayerId::from(id),
            elo,
            display_name: id.to_string(),
            photo_ref: None,
            joined_at: 0,
            equipped_cursor: "default".to_string(),
            equipped_effect: None,
        }
    }

    fn setup() -> (Arc<MatchmakingCoordinator>, Arc<RecordingOrchestrator>) {
        let store = Arc::new(InMemoryQueueStore::new());
        let audit = Arc::new(LoggingAuditSink::new());
        let coordinator = MatchmakingCoordinator::new(store, audit);
        let orchestrator = RecordingOrchestrator::new();
        coordinator.set_orchestrator(orchestrator.clone());
        (coordinator, orchestrator)
    }

    #[tokio::test]
    async fn friends_mode_rejects_empty_friend_list_before_any_queue_io() {
        let (coordinator, _orch) = setup();
        let sink = RecordingSink::new();
        let err = coordinator
            .enqueue(entry("dave", 1500), Mode::Friends, vec![], sink)
            .await
            .unwrap_err();
        assert_eq!(err, EnqueueError::NoFriends);
        assert!(!coordinator
            .store
            .zismember("queue:friends", "dave")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn enqueue_twice_in_different_modes_is_rejected() {
        let (coordinator, _orch) = setup();
        let sink = RecordingSink::new();
        coordinator
            .enqueue(entry("alice", 1500), Mode::Ranked, vec![], sink.clone())
            .await
            .unwrap();
        let err = coordinator
            .enqueue(entry("alice", 1500), Mode::Training, vec![], sink)
            .await
            .unwrap_err();
        assert_eq!(err, EnqueueError::AlreadyQueued);
    }

    #[tokio::test]
    async fn two_ranked_players_pair_and_orchestrator_is_invoked_once() {
        let (coordinator, orch) = setup();
        let a_sink = RecordingSink::new();
        let b_sink = RecordingSink::new();

        coordinator
            .enqueue(entry("alice", 1500), Mode::Ranked, vec![], a_sink.clone())
            .await
            .unwrap();
        coordinator
            .enqueue(entry("bob", 1510), Mode::Ranked, vec![], b_sink.clone())
            .await
            .unwrap();

        // Directly exercise the pairing step rather than waiting on the
        // 1s-cadence search task.
        let paired = coordinator.try_pair(&PlayerId::from("alice"), Mode::Ranked).await;
        assert!(paired);

        assert_eq!(a_sink.found.lock().await.len(), 1);
        assert_eq!(b_sink.found.lock().await.len(), 1);
        assert_eq!(orch.accepted.lock().await.len(), 1);
        assert!(!coordinator.store.zismember("queue:ranked", "alice").await.unwrap());
        assert!(!coordinator.store.zismember("queue:ranked", "bob").await.unwrap());
    }

    #[tokio::test]
    async fn friends_mode_only_pairs_mutual_friends() {
        let (coordinator, orch) = setup();
        let a_sink = RecordingSink::new();
        let b_sink = RecordingSink::new();

        coordinator
            .enqueue(entry("alice", 1500), Mode::Friends, vec![PlayerId::from("carol")], a_sink)
            .await
            .unwrap();
        coordinator
            .enqueue(entry("bob", 1500), Mode::Friends, vec![PlayerId::from("dan")], b_sink)
            .await
            .unwrap();

        let paired = coordinator.try_pair(&PlayerId::from("alice"), Mode::Friends).await;
        assert!(!paired, "alice and bob are not friends, must not pair");
        assert_eq!(orch.accepted.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn bot_fallback_creates_is_bot_pending_match() {
        let (coordinator, orch) = setup();
        let sink = RecordingSink::new();
        coordinator
            .enqueue(entry("carol", 1500), Mode::Training, vec![], sink.clone())
            .await
            .unwrap();

        let created = coordinator.try_create_bot_match(&PlayerId::from("carol"), Mode::Training).await;
        assert!(created);
        let accepted = orch.accepted.lock().await;
        assert_eq!(accepted.len(), 1);
        assert!(accepted[0].is_bot);
        assert!(accepted[0].player2.is_none());
        assert_eq!(sink.found.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn cleanup_after_match_clears_matched_flags_and_friends_safety() {
        let (coordinator, _orch) = setup();
        coordinator.store.sadd("matched:ranked", "alice").await.unwrap();
        coordinator.store.sadd("matched:ranked", "bob").await.unwrap();
        coordinator.store.sadd("matched:friends", "alice").await.unwrap();

        coordinator
            .cleanup_after_match(&PlayerId::from("alice"), Some(&PlayerId::from("bob")), Mode::Ranked)
            .await;

        assert!(!coordinator.store.sismember("matched:ranked", "alice").await.unwrap());
        assert!(!coordinator.store.sismember("matched:ranked", "bob").await.unwrap());
        assert!(!coordinator.store.sismember("matched:friends", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn leave_queue_then_enqueue_again_is_indistinguishable_from_fresh() {
        let (coordinator, _orch) = setup();
        let sink = RecordingSink::new();
        coordinator
            .enqueue(entry("erin", 1500), Mode::Ranked, vec![], sink.clone())
            .await
            .unwrap();
        coordinator.leave_queue(&PlayerId::from("erin"), Mode::Ranked).await.unwrap();
        assert!(!coordinator.store.zismember("queue:ranked", "erin").await.unwrap());

        coordinator
            .enqueue(entry("erin", 1500), Mode::Ranked, vec![], sink)
            .await
            .unwrap();
        assert!(coordinator.store.zismember("queue:ranked", "erin").await.unwrap());
    }
}
