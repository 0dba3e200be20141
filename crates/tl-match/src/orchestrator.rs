//! Match-execution core: session creation, synchronized start, keystroke
//! routing, and settlement. Ported from
//! `original_source/services/match_orchestrator.py::MatchOrchestrator`.
//!
//! A single authoritative writer per session is realized as an
//! `Arc<Mutex<MatchSession>>` with every mutation confined to a brief
//! critical section — no mutation ever spans an `.await` that isn't
//! itself a lock acquisition, so a 30-second race never blocks another
//! session's keystrokes, mirroring the teacher's `Room`/`Casino` split
//! (an imperative shell task owns mutation, everyone else talks to it).
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, OnceCell, RwLock};
use tokio::time::timeout;

use tl_anticheat::{AntiCheat, ValidationOutcome};
use tl_bot::BotConfig;
use tl_core::{
    CharIndex, Elo, MatchId, Millis, Mode, Outcome, PlayerId, Rank, WordIndex,
    CALLBACK_POLL_INTERVAL_MS, CALLBACK_REGISTRATION_TIMEOUT_SECS, FORFEIT_ELO_DELTA,
    GAME_END_RETRY_TIMEOUT_SECS, GAME_START_RETRY_TIMEOUT_SECS, MATCH_DURATION_SECS,
    NOTIFICATION_RETRY_ATTEMPTS, SYNCHRONIZED_START_DELAY_SECS,
};
use tl_matchmaking::{MatchmakingCoordinator, OrchestratorPort, PendingMatch};
use tl_protocol::{CoinBreakdown, MatchResult, OpponentProfile};
use tl_rating::{CoinBreakdown as RatingCoinBreakdown, LeaderboardStanding, MatchParticipant, Rating};
use tl_store::{AuditEvent, AuditSink, LeaderboardQuery, MatchRecord, MatchStore, StatsPatch, UserStore};
use tl_words::WordSource;

use crate::session::{BotSide, HumanSide, MatchSession, SessionState, Side};
use crate::sink::{MatchSink, PublicSink};

fn now_ms() -> Millis {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_millis() as Millis
}

/// Resolved per-side settlement inputs, gathered from the session before
/// its lock is released, and never mutated again.
struct SideSnapshot {
    player_id: PlayerId,
    display_name: String,
    photo_url: Option<String>,
    equipped_cursor: String,
    equipped_effect: Option<String>,
    is_bot: bool,
    sink: Option<Arc<dyn MatchSink>>,
    stats: tl_anticheat::PlayerStats,
}

/// Owns every `MatchSession` from creation to cleanup. Neither the
/// sessions-by-match nor sessions-by-player index is ever consulted
/// without the outer `RwLock`, but all mutation of session *contents*
/// goes through the per-session `Mutex` instead — the outer lock only
/// ever guards the index maps themselves.
pub struct MatchOrchestrator {
    sessions_by_match: RwLock<HashMap<MatchId, Arc<Mutex<MatchSession>>>>,
    sessions_by_player: RwLock<HashMap<PlayerId, MatchId>>,
    creation_lock: Mutex<()>,
    user_store: Arc<dyn UserStore>,
    match_store: Arc<dyn MatchStore>,
    audit: Arc<dyn AuditSink>,
    leaderboard: Arc<dyn LeaderboardQuery>,
    public_sink: Arc<dyn PublicSink>,
    /// Wired once, after construction — mutually referential with
    /// `MatchmakingCoordinator::set_orchestrator`, so neither side can
    /// be constructed with the other injected up front.
    matchmaking: OnceCell<Arc<MatchmakingCoordinator>>,
    /// Lets inherent methods spawn tasks that outlive the call that
    /// created them without taking `self: Arc<Self>` at every call site
    /// (`OrchestratorPort::accept` only gets `&self`).
    self_ref: OnceCell<Arc<MatchOrchestrator>>,
}

impl MatchOrchestrator {
    pub fn new(
        user_store: Arc<dyn UserStore>,
        match_store: Arc<dyn MatchStore>,
        audit: Arc<dyn AuditSink>,
        leaderboard: Arc<dyn LeaderboardQuery>,
        public_sink: Arc<dyn PublicSink>,
    ) -> Arc<Self> {
        let orchestrator = Arc::new(Self {
            sessions_by_match: RwLock::new(HashMap::new()),
            sessions_by_player: RwLock::new(HashMap::new()),
            creation_lock: Mutex::new(()),
            user_store,
            match_store,
            audit,
            leaderboard,
            public_sink,
            matchmaking: OnceCell::new(),
            self_ref: OnceCell::new(),
        });
        orchestrator
            .self_ref
            .set(orchestrator.clone())
            .unwrap_or_else(|_| unreachable!("self_ref set exactly once, at construction"));
        orchestrator
    }

    /// Wires the coordinator `cleanup_after_match` reports back to.
    /// Must be called exactly once before the first pairing arrives.
    pub fn set_matchmaking(&self, matchmaking: Arc<MatchmakingCoordinator>) {
        self.matchmaking
            .set(matchmaking)
            .unwrap_or_else(|_| panic!("matchmaking coordinator already wired"));
    }

    fn matchmaking(&self) -> Arc<MatchmakingCoordinator> {
        self.matchmaking
            .get()
            .expect("matchmaking coordinator must be wired before matches are accepted")
            .clone()
    }

    fn arc(&self) -> Arc<Self> {
        self.self_ref
            .get()
            .expect("self_ref set at construction")
            .clone()
    }

    async fn session_for(&self, match_id: MatchId) -> Option<Arc<Mutex<MatchSession>>> {
        self.sessions_by_match.read().await.get(&match_id).cloned()
    }

    /// The session a connected player currently belongs to, if any.
    pub async fn session_for_player(&self, player: &PlayerId) -> Option<MatchId> {
        self.sessions_by_player.read().await.get(player).copied()
    }

    /// Registers `sink` for `player`'s side of `match_id`. A session or
    /// player that doesn't exist is silently ignored — a stale or
    /// duplicate registration from a reconnecting client is not an
    /// error (§4.6.2).
    pub async fn register_sink(&self, match_id: MatchId, player: &PlayerId, sink: Arc<dyn MatchSink>) {
        let Some(session) = self.session_for(match_id).await else {
            return;
        };
        let mut guard = session.lock().await;
        if let Some(side) = guard.side_of_mut(player) {
            side.sink = Some(sink);
        }
    }

    // ------------------------------------------------------------------
    // Session creation (§4.6.1)
    // ------------------------------------------------------------------

    async fn create_session(&self, pending: PendingMatch) -> (Arc<Mutex<MatchSession>>, Vec<String>) {
        let _guard = self.creation_lock.lock().await;
        if let Some(existing) = self.session_for(pending.match_id).await {
            let words = existing.lock().await.words.clone();
            return (existing, words);
        }

        let mut rng = rand::rng();
        let words = WordSource::generate(&mut rng);
        let word_text = WordSource::join(&words);

        let player1 = HumanSide {
            player_id: pending.player1.player_id.clone(),
            display_name: pending.player1.display_name.clone(),
            photo_ref: pending.player1.photo_ref.clone(),
            elo: pending.player1.elo,
            equipped_cursor: pending.player1.equipped_cursor.clone(),
            equipped_effect: pending.player1.equipped_effect.clone(),
            progress: tl_anticheat::TypingProgress::new(),
            sink: None,
        };

        let side2 = if pending.is_bot {
            let avg_wpm = self
                .user_store
                .get(&pending.player1.player_id)
                .await
                .map(|record| record.avg_wpm)
                .filter(|wpm| *wpm > 0.0);
            let config = BotConfig::from_player_stats(pending.player1.elo, avg_wpm, &mut rng);
            let simulator = tl_bot::BotSimulator::new(config, words.clone());
            let handle = simulator.handle();
            Side::Bot(BotSide {
                simulator: Some(simulator),
                handle,
            })
        } else {
            let opponent = pending
                .player2
                .clone()
                .expect("a non-bot pending match always carries player2");
            Side::Human(HumanSide {
                player_id: opponent.player_id,
                display_name: opponent.display_name,
                photo_ref: opponent.photo_ref,
                elo: opponent.elo,
                equipped_cursor: opponent.equipped_cursor,
                equipped_effect: opponent.equipped_effect,
                progress: tl_anticheat::TypingProgress::new(),
                sink: None,
            })
        };

        let session = MatchSession {
            match_id: pending.match_id,
            mode: pending.mode,
            words: words.clone(),
            word_text,
            state: SessionState::Preparing,
            created_at: now_ms(),
            started_at: None,
            ended_at: None,
            start_in_progress: false,
            player1,
            side2,
        };

        let session = Arc::new(Mutex::new(session));
        self.sessions_by_match
            .write()
            .await
            .insert(pending.match_id, session.clone());
        let mut by_player = self.sessions_by_player.write().await;
        by_player.insert(pending.player1.player_id.clone(), pending.match_id);
        if let Some(p2) = &pending.player2 {
            by_player.insert(p2.player_id.clone(), pending.match_id);
        }
        (session, words)
    }

    // ------------------------------------------------------------------
    // Synchronized start (§4.6.3)
    // ------------------------------------------------------------------

    async fn start(self: Arc<Self>, match_id: MatchId) {
        let Some(session) = self.session_for(match_id).await else {
            return;
        };

        {
            let mut guard = session.lock().await;
            if guard.started_at.is_some() || guard.start_in_progress {
                return;
            }
            guard.start_in_progress = true;
        }

        let is_bot = session.lock().await.side2.is_bot();

        if !is_bot {
            let poll = Duration::from_millis(CALLBACK_POLL_INTERVAL_MS);
            let cap = Duration::from_secs(CALLBACK_REGISTRATION_TIMEOUT_SECS);
            let mut waited = Duration::ZERO;
            loop {
                let (p1_ready, p2_ready) = {
                    let guard = session.lock().await;
                    (
                        guard.player1.registered(),
                        guard.side2.as_human().map(|h| h.registered()).unwrap_or(true),
                    )
                };
                if p1_ready && p2_ready {
                    break;
                }
                if waited >= cap {
                    let (p1_id, p2_id) = {
                        let guard = session.lock().await;
                        (
                            guard.player1.player_id.clone(),
                            guard.side2.as_human().map(|h| h.player_id.clone()),
                        )
                    };
                    let mut failed = Vec::new();
                    if !p1_ready {
                        failed.push(p1_id);
                    }
                    if !p2_ready {
                        if let Some(id) = p2_id {
                            failed.push(id);
                        }
                    }
                    log::warn!("match {match_id}: callback registration timed out, forfeiting {failed:?}");
                    self.settle(match_id, Some(failed)).await;
                    return;
                }
                tokio::time::sleep(poll).await;
                waited += poll;
            }
        }

        let scheduled_start_time_ms = now_ms() + SYNCHRONIZED_START_DELAY_SECS as i64 * 1000;
        let (p1_sink, p2_sink) = {
            let mut guard = session.lock().await;
            guard.started_at = Some(now_ms());
            guard.state = SessionState::Waiting;
            (
                guard.player1.sink.clone(),
                guard.side2.as_human().and_then(|h| h.sink.clone()),
            )
        };

        for sink in [p1_sink, p2_sink].into_iter().flatten() {
            tokio::spawn(async move {
                for _ in 0..NOTIFICATION_RETRY_ATTEMPTS {
                    let delivered = timeout(
                        Duration::from_secs(GAME_START_RETRY_TIMEOUT_SECS),
                        sink.on_game_start(scheduled_start_time_ms, MATCH_DURATION_SECS),
                    )
                    .await;
                    if delivered.is_ok() {
                        return;
                    }
                }
                log::warn!("match {match_id}: GAME_START delivery exhausted its retries");
            });
        }

        let this = self.clone();
        let session_for_deferred = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(SYNCHRONIZED_START_DELAY_SECS)).await;

            let became_active = {
                let mut guard = session_for_deferred.lock().await;
                if guard.state == SessionState::Waiting {
                    guard.state = SessionState::Active;
                    true
                } else {
                    false
                }
            };
            if !became_active {
                return;
            }

            let (mode, display_names) = {
                let guard = session_for_deferred.lock().await;
                let mut names = vec![guard.player1.display_name.clone()];
                if let Some(h) = guard.side2.as_human() {
                    names.push(h.display_name.clone());
                }
                (guard.mode, names)
            };
            this.public_sink.on_match_started(mode, display_names).await;

            let timer_session = session_for_deferred.clone();
            let timer_orchestrator = this.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(MATCH_DURATION_SECS)).await;
                let state = timer_session.lock().await.state;
                if matches!(state, SessionState::Active | SessionState::Waiting) {
                    timer_orchestrator.settle(match_id, None).await;
                }
            });

            let bot_simulator = {
                let mut guard = session_for_deferred.lock().await;
                match &mut guard.side2 {
                    Side::Bot(bot) => bot.simulator.take(),
                    Side::Human(_) => None,
                }
            };
            if let Some(mut simulator) = bot_simulator {
                let player1_sink = session_for_deferred.lock().await.player1.sink.clone();
                tokio::spawn(async move {
                    let (tx, mut rx) = mpsc::unbounded_channel::<(CharIndex, WordIndex)>();
                    tokio::spawn(async move {
                        while let Some((char_index, word_index)) = rx.recv().await {
                            if let Some(sink) = &player1_sink {
                                let _ = timeout(
                                    Duration::from_secs(GAME_START_RETRY_TIMEOUT_SECS),
                                    sink.on_opponent_progress(char_index, word_index),
                                )
                                .await;
                            }
                        }
                    });

                    let mut rng = rand::rng();
                    // `simulator`'s counters are shared with the `BotHandle`
                    // still sitting in the session's `BotSide`, so
                    // settlement reads live totals here rather than
                    // waiting on this task to finish (§4.6.6 step 2).
                    simulator
                        .run(Duration::from_secs(MATCH_DURATION_SECS), &mut rng, move |char_index, word_index| {
                            let _ = tx.send((char_index, word_index));
                        })
                        .await;
                });
            }
        });
    }

    // ------------------------------------------------------------------
    // Keystroke routing (§4.6.5)
    // ------------------------------------------------------------------

    /// Applies a backspace: a position rewind, never validated against
    /// C2 and never logged as a keystroke (§4.6.5 supplemental detail).
    pub async fn handle_backspace(&self, match_id: MatchId, player: &PlayerId, char_index: CharIndex) {
        let Some(session) = self.session_for(match_id).await else {
            return;
        };
        let mut guard = session.lock().await;
        if guard.state != SessionState::Active {
            return;
        }
        if let Some(side) = guard.side_of_mut(player) {
            AntiCheat::apply_backspace(&mut side.progress, char_index);
        }
    }

    pub async fn handle_keystroke(
        &self,
        match_id: MatchId,
        player: &PlayerId,
        ch: char,
        timestamp_ms: Millis,
        char_index: CharIndex,
    ) {
        let Some(session) = self.session_for(match_id).await else {
            return;
        };
        let mut guard = session.lock().await;

        let is_player1 = guard.player1.player_id == *player;
        if !is_player1 && !matches!(&guard.side2, Side::Human(h) if h.player_id == *player) {
            return;
        }

        if guard.state == SessionState::Preparing {
            let registered = if is_player1 {
                guard.player1.registered()
            } else {
                matches!(&guard.side2, Side::Human(h) if h.registered())
            };
            if registered {
                guard.state = SessionState::Waiting;
            }
        }
        if guard.state != SessionState::Active {
            return;
        }

        let word_text = guard.word_text.clone();
        let MatchSession { player1, side2, .. } = &mut *guard;
        let (mine, other): (&mut HumanSide, Option<&mut HumanSide>) = if is_player1 {
            (player1, side2.as_human_mut())
        } else {
            (
                side2.as_human_mut().expect("checked above that side2 is this player"),
                Some(player1),
            )
        };

        let outcome = AntiCheat::validate_keystroke(&mut mine.progress, &word_text, ch, timestamp_ms, char_index);
        match outcome {
            ValidationOutcome::Duplicate => {}
            ValidationOutcome::Rejected(_) => {
                let sink = mine.sink.clone();
                drop(guard);
                if let Some(sink) = sink {
                    sink.on_invalid_keystroke("keystroke rejected: below minimum interval".to_string())
                        .await;
                }
            }
            ValidationOutcome::Accepted { is_error } => {
                let char_index = mine.progress.current_char_index;
                let word_index = mine.progress.current_word_index;
                let opponent_sink = if is_error {
                    None
                } else {
                    other.and_then(|o| o.sink.clone())
                };
                drop(guard);
                if let Some(sink) = opponent_sink {
                    let _ = timeout(
                        Duration::from_secs(GAME_START_RETRY_TIMEOUT_SECS),
                        sink.on_opponent_progress(char_index, word_index),
                    )
                    .await;
                }
            }
        }
    }

    pub async fn handle_word_complete(&self, match_id: MatchId, player: &PlayerId, word_index: WordIndex) {
        let Some(session) = self.session_for(match_id).await else {
            return;
        };

        let finished_last_word = {
            let mut guard = session.lock().await;
            if guard.state != SessionState::Active {
                return;
            }
            let total_words = guard.words.len();
            let is_player1 = guard.player1.player_id == *player;
            let side = if is_player1 {
                Some(&mut guard.player1)
            } else {
                guard.side2.as_human_mut().filter(|h| h.player_id == *player)
            };
            let Some(side) = side else {
                return;
            };
            let current = side.progress.current_word_index;
            if word_index < current || word_index > current + 1 || word_index >= total_words {
                return;
            }
            AntiCheat::complete_word(&mut side.progress, word_index);
            word_index + 1 == total_words
        };

        if finished_last_word {
            self.settle(match_id, None).await;
        }
    }

    /// Connection loss or explicit cancel. The disconnecting player
    /// forfeits (§4.6.7(a)/(c)); idempotent against a match already
    /// settled by any other path.
    pub async fn handle_disconnect(&self, match_id: MatchId, player: &PlayerId) {
        self.settle(match_id, Some(vec![player.clone()])).await;
    }

    // ------------------------------------------------------------------
    // Settlement (§4.6.6 endGame, §4.6.7 forfeit share this tail)
    // ------------------------------------------------------------------

    async fn settle(&self, match_id: MatchId, forfeited: Option<Vec<PlayerId>>) {
        let Some(session) = self.session_for(match_id).await else {
            return;
        };

        let (mode, elapsed_seconds, p1, p2) = {
            let mut guard = session.lock().await;
            if guard.state == SessionState::Finished {
                return;
            }
            guard.state = SessionState::Finished;
            let ended_at = now_ms();
            guard.ended_at = Some(ended_at);
            let started = guard.started_at.unwrap_or(guard.created_at);
            let elapsed_seconds = ((ended_at - started).max(100) as f64) / 1000.0;

            let p1 = SideSnapshot {
                player_id: guard.player1.player_id.clone(),
                display_name: guard.player1.display_name.clone(),
                photo_url: guard.player1.photo_ref.clone(),
                equipped_cursor: guard.player1.equipped_cursor.clone(),
                equipped_effect: guard.player1.equipped_effect.clone(),
                is_bot: false,
                sink: guard.player1.sink.clone(),
                stats: AntiCheat::stats(
                    guard.player1.progress.chars_typed,
                    guard.player1.progress.errors,
                    guard.player1.progress.words_completed,
                    elapsed_seconds,
                ),
            };

            let p2 = match &guard.side2 {
                Side::Human(h) => SideSnapshot {
                    player_id: h.player_id.clone(),
                    display_name: h.display_name.clone(),
                    photo_url: h.photo_ref.clone(),
                    equipped_cursor: h.equipped_cursor.clone(),
                    equipped_effect: h.equipped_effect.clone(),
                    is_bot: false,
                    sink: h.sink.clone(),
                    stats: AntiCheat::stats(
                        h.progress.chars_typed,
                        h.progress.errors,
                        h.progress.words_completed,
                        elapsed_seconds,
                    ),
                },
                Side::Bot(bot) => {
                    // Stop the run loop and read its live counters rather
                    // than a post-`run()` snapshot: the duration timer and
                    // the bot's own run task race to finish around the
                    // same instant, and early finish/forfeit settle well
                    // before the bot would ever stop on its own (§4.6.6
                    // step 2).
                    bot.handle.stop();
                    let result = bot.handle.result();
                    SideSnapshot {
                        player_id: PlayerId::from("__bot__"),
                        display_name: "Bot".to_string(),
                        photo_url: None,
                        equipped_cursor: "default".to_string(),
                        equipped_effect: None,
                        is_bot: true,
                        sink: None,
                        stats: AntiCheat::stats(
                            result.chars_typed.max(0) as u32,
                            result.errors,
                            result.words_completed,
                            elapsed_seconds,
                        ),
                    }
                }
            };

            (guard.mode, elapsed_seconds, p1, p2)
        };

        let p1_record = self.user_store.get(&p1.player_id).await;
        let p1_elo_before = p1_record.as_ref().map(|r| r.elo).unwrap_or(1500);
        let p1_games_played = p1_record.as_ref().map(|r| r.total_matches).unwrap_or(0);

        let (p2_elo_before, p2_games_played) = if p2.is_bot {
            (p1_elo_before, 0)
        } else {
            let record = self.user_store.get(&p2.player_id).await;
            (
                record.as_ref().map(|r| r.elo).unwrap_or(1500),
                record.as_ref().map(|r| r.total_matches).unwrap_or(0),
            )
        };

        let (p1_outcome, p2_outcome, p1_delta, p2_delta, forfeit_by) = match forfeited {
            Some(failed) => {
                let p1_failed = failed.contains(&p1.player_id);
                let p2_failed = !p2.is_bot && failed.contains(&p2.player_id);
                let ranked_pvp = mode == Mode::Ranked && !p2.is_bot;
                let swing = if ranked_pvp { FORFEIT_ELO_DELTA } else { 0 };
                let forfeit_by = failed.first().cloned();
                if p1_failed && (p2_failed || p2.is_bot && failed.len() > 1) {
                    (Outcome::Tie, Outcome::Tie, 0, 0, forfeit_by)
                } else if p1_failed {
                    (Outcome::Loss, Outcome::Win, -swing, swing, forfeit_by)
                } else if p2_failed {
                    (Outcome::Win, Outcome::Loss, swing, -swing, forfeit_by)
                } else {
                    (Outcome::Tie, Outcome::Tie, 0, 0, forfeit_by)
                }
            }
            None => {
                let participant1 = MatchParticipant {
                    rating: Rating::new(p1_elo_before),
                    games_played: p1_games_played,
                    score: p1.stats.score,
                };
                let participant2 = MatchParticipant {
                    rating: Rating::new(p2_elo_before),
                    games_played: p2_games_played,
                    score: p2.stats.score,
                };
                let settled = tl_rating::settle(mode, &participant1, &participant2, p2.is_bot);
                let p2_outcome = match settled.player_outcome {
                    Outcome::Win => Outcome::Loss,
                    Outcome::Loss => Outcome::Win,
                    Outcome::Tie => Outcome::Tie,
                };
                (
                    settled.player_outcome,
                    p2_outcome,
                    settled.player_delta,
                    settled.opponent_delta,
                    None,
                )
            }
        };

        let p1_elo_after = (p1_elo_before + p1_delta).max(0);
        let p2_elo_after = (p2_elo_before + p2_delta).max(0);

        let p1_coins = self.coin_reward(&p1.player_id, p1_outcome, p1_elo_before).await;
        let p2_coins = if p2.is_bot {
            RatingCoinBreakdown {
                base: 0,
                rank_bonus: 0,
                leaderboard_bonus: 0,
                total: 0,
            }
        } else {
            self.coin_reward(&p2.player_id, p2_outcome, p2_elo_before).await
        };

        if let Err(err) = self.user_store.add_coins(&p1.player_id, p1_coins.total.max(0) as u64).await {
            self.audit_settlement_failure(match_id, "credit_coins_player1", err.to_string()).await;
        }
        if !p2.is_bot {
            if let Err(err) = self.user_store.add_coins(&p2.player_id, p2_coins.total.max(0) as u64).await {
                self.audit_settlement_failure(match_id, "credit_coins_player2", err.to_string()).await;
            }
        }

        if mode == Mode::Ranked {
            let patch1 = StatsPatch {
                elo_delta: p1_delta,
                won: p1_outcome == Outcome::Win,
                lost: p1_outcome == Outcome::Loss,
                match_wpm: p1.stats.wpm,
                match_accuracy: p1.stats.accuracy,
            };
            if let Err(err) = self.user_store.update_stats(&p1.player_id, patch1).await {
                self.audit_settlement_failure(match_id, "update_stats_player1", err.to_string()).await;
            }
            if !p2.is_bot {
                let patch2 = StatsPatch {
                    elo_delta: p2_delta,
                    won: p2_outcome == Outcome::Win,
                    lost: p2_outcome == Outcome::Loss,
                    match_wpm: p2.stats.wpm,
                    match_accuracy: p2.stats.accuracy,
                };
                if let Err(err) = self.user_store.update_stats(&p2.player_id, patch2).await {
                    self.audit_settlement_failure(match_id, "update_stats_player2", err.to_string()).await;
                }
            }
        }

        let p1_result = Arc::new(MatchResult {
            match_id,
            mode,
            duration_seconds: elapsed_seconds.round() as u64,
            your_wpm: p1.stats.wpm,
            your_accuracy: p1.stats.accuracy,
            your_score: p1.stats.score,
            your_elo_before: p1_elo_before,
            your_elo_after: p1_elo_after,
            your_elo_change: p1_delta,
            result: p1_outcome,
            coins: CoinBreakdown {
                base: p1_coins.base,
                rank_bonus: p1_coins.rank_bonus,
                leaderboard_bonus: p1_coins.leaderboard_bonus,
                total: p1_coins.total,
            },
            opponent_display_name: p2.display_name.clone(),
            opponent_photo_url: p2.photo_url.clone(),
            opponent_is_bot: p2.is_bot,
            opponent_wpm: p2.stats.wpm,
            opponent_accuracy: p2.stats.accuracy,
            opponent_score: p2.stats.score,
            opponent_rank: Rank::from_elo(p2_elo_before),
            opponent_elo: p2_elo_before,
            opponent_elo_change: p2_delta,
        });
        let p2_result = Arc::new(MatchResult {
            match_id,
            mode,
            duration_seconds: elapsed_seconds.round() as u64,
            your_wpm: p2.stats.wpm,
            your_accuracy: p2.stats.accuracy,
            your_score: p2.stats.score,
            your_elo_before: p2_elo_before,
            your_elo_after: p2_elo_after,
            your_elo_change: p2_delta,
            result: p2_outcome,
            coins: CoinBreakdown {
                base: p2_coins.base,
                rank_bonus: p2_coins.rank_bonus,
                leaderboard_bonus: p2_coins.leaderboard_bonus,
                total: p2_coins.total,
            },
            opponent_display_name: p1.display_name.clone(),
            opponent_photo_url: p1.photo_url.clone(),
            opponent_is_bot: false,
            opponent_wpm: p1.stats.wpm,
            opponent_accuracy: p1.stats.accuracy,
            opponent_score: p1.stats.score,
            opponent_rank: Rank::from_elo(p1_elo_before),
            opponent_elo: p1_elo_before,
            opponent_elo_change: p1_delta,
        });

        if let Some(sink) = p1.sink.clone() {
            self.deliver_game_end(match_id, sink, p1_result).await;
        }
        if let Some(sink) = p2.sink.clone() {
            self.deliver_game_end(match_id, sink, p2_result).await;
        }

        self.public_sink
            .on_match_ended(mode, vec![p1.display_name.clone(), p2.display_name.clone()], p1_outcome)
            .await;

        let record = MatchRecord {
            match_id,
            mode,
            player1: p1.player_id.clone(),
            player2: if p2.is_bot { None } else { Some(p2.player_id.clone()) },
            player1_score: p1.stats.score,
            player2_score: p2.stats.score,
            player1_wpm: p1.stats.wpm,
            player2_wpm: p2.stats.wpm,
            player1_accuracy: p1.stats.accuracy,
            player2_accuracy: p2.stats.accuracy,
            player1_elo_delta: p1_delta,
            player2_elo_delta: p2_delta,
            duration_seconds: elapsed_seconds.round() as u32,
            created_at: now_ms(),
            ended_at: now_ms(),
            forfeit_by,
        };
        if let Err(err) = self.match_store.insert(record).await {
            self.audit_settlement_failure(match_id, "archive_match", err.to_string()).await;
        }

        let p2_id_for_cleanup = if p2.is_bot { None } else { Some(p2.player_id.clone()) };
        self.matchmaking()
            .cleanup_after_match(&p1.player_id, p2_id_for_cleanup.as_ref(), mode)
            .await;

        self.sessions_by_match.write().await.remove(&match_id);
        let mut by_player = self.sessions_by_player.write().await;
        by_player.remove(&p1.player_id);
        if !p2.is_bot {
            by_player.remove(&p2.player_id);
        }
    }

    async fn coin_reward(&self, player: &PlayerId, outcome: Outcome, elo: Elo) -> RatingCoinBreakdown {
        let rank = Rank::from_elo(elo);
        let bonus = self.leaderboard.bonus_for(player).await;
        let standing = if bonus.is_top3 {
            LeaderboardStanding::Top3
        } else if bonus.is_top10 {
            LeaderboardStanding::Top10
        } else {
            LeaderboardStanding::OutOfRange
        };
        tl_rating::reward(outcome, rank, standing)
    }

    async fn deliver_game_end(&self, match_id: MatchId, sink: Arc<dyn MatchSink>, result: Arc<MatchResult>) {
        for _ in 0..NOTIFICATION_RETRY_ATTEMPTS {
            let delivered = timeout(
                Duration::from_secs(GAME_END_RETRY_TIMEOUT_SECS),
                sink.on_game_end(result.clone()),
            )
            .await;
            if delivered.is_ok() {
                return;
            }
        }
        self.audit
            .log(AuditEvent::NotificationDeliveryFailed {
                player: PlayerId::from(format!("match:{match_id}").as_str()),
                kind: "game_end",
                attempts: NOTIFICATION_RETRY_ATTEMPTS,
            })
            .await;
    }

    async fn audit_settlement_failure(&self, match_id: MatchId, step: &'static str, reason: String) {
        self.audit
            .log(AuditEvent::SettlementStepFailed { match_id, step, reason })
            .await;
    }
}

#[async_trait]
impl OrchestratorPort for MatchOrchestrator {
    async fn accept(&self, pending: PendingMatch) -> Vec<String> {
        let match_id = pending.match_id;
        let (_session, words) = self.create_session(pending).await;
        let this = self.arc();
        tokio::spawn(async move {
            this.start(match_id).await;
        });
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullPublicSink;
    use std::sync::Mutex as StdMutex;
    use tl_core::PlayerId;
    use tl_matchmaking::entry::QueueEntry;
    use tl_store::{InMemoryLeaderboard, InMemoryMatchStore, InMemoryUserStore, LoggingAuditSink};

    fn entry(id: &str, elo: Elo) -> QueueEntry {
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

    struct RecordingSink {
        progress: StdMutex<Vec<(CharIndex, WordIndex)>>,
        invalid: StdMutex<Vec<String>>,
        ended: StdMutex<Option<Arc<MatchResult>>>,
        started: StdMutex<bool>,
    }
    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                progress: StdMutex::new(Vec::new()),
                invalid: StdMutex::new(Vec::new()),
                ended: StdMutex::new(None),
                started: StdMutex::new(false),
            })
        }
    }
    #[async_trait]
    impl MatchSink for RecordingSink {
        async fn on_game_start(&self, _scheduled_start_time_ms: Millis, _duration_seconds: u64) {
            *self.started.lock().unwrap() = true;
        }
        async fn on_opponent_progress(&self, char_index: CharIndex, word_index: WordIndex) {
            self.progress.lock().unwrap().push((char_index, word_index));
        }
        async fn on_game_end(&self, result: Arc<MatchResult>) {
            *self.ended.lock().unwrap() = Some(result);
        }
        async fn on_invalid_keystroke(&self, reason: String) {
            self.invalid.lock().unwrap().push(reason);
        }
    }

    fn harness() -> (
        Arc<MatchOrchestrator>,
        Arc<InMemoryUserStore>,
        Arc<InMemoryMatchStore>,
    ) {
        let user_store = Arc::new(InMemoryUserStore::new());
        let match_store = Arc::new(InMemoryMatchStore::new());
        let audit = Arc::new(LoggingAuditSink::new());
        let leaderboard = Arc::new(InMemoryLeaderboard::new());
        let public_sink = Arc::new(NullPublicSink);
        let orchestrator = MatchOrchestrator::new(user_store.clone(), match_store.clone(), audit, leaderboard, public_sink);
        let queue_store = Arc::new(tl_store::InMemoryQueueStore::new());
        let coordinator = MatchmakingCoordinator::new(queue_store, Arc::new(LoggingAuditSink::new()));
        coordinator.set_orchestrator(orchestrator.clone());
        orchestrator.set_matchmaking(coordinator);
        (orchestrator, user_store, match_store)
    }

    #[tokio::test]
    async fn accept_creates_a_session_indexed_by_both_players() {
        let (orchestrator, _users, _matches) = harness();
        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: entry("alice", 1500),
            player2: Some(entry("bob", 1510)),
            mode: Mode::Ranked,
            is_bot: false,
        };
        let words = OrchestratorPort::accept(&*orchestrator, pending.clone()).await;
        assert_eq!(words.len(), tl_core::WORD_COUNT);
        assert_eq!(
            orchestrator.session_for_player(&PlayerId::from("alice")).await,
            Some(pending.match_id)
        );
        assert_eq!(
            orchestrator.session_for_player(&PlayerId::from("bob")).await,
            Some(pending.match_id)
        );
    }

    #[tokio::test]
    async fn keystroke_before_registration_does_not_panic_and_is_ignored() {
        let (orchestrator, _users, _matches) = harness();
        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: entry("alice", 1500),
            player2: Some(entry("bob", 1500)),
            mode: Mode::Training,
            is_bot: false,
        };
        let match_id = pending.match_id;
        OrchestratorPort::accept(&*orchestrator, pending).await;
        orchestrator
            .handle_keystroke(match_id, &PlayerId::from("alice"), 't', 0, 0)
            .await;
        // Session is still `preparing`/`waiting`, never `active`: no panic, no mutation observable from outside.
    }

    #[tokio::test]
    async fn register_sink_for_unknown_match_is_a_silent_no_op() {
        let (orchestrator, _users, _matches) = harness();
        let sink = RecordingSink::new();
        orchestrator
            .register_sink(MatchId::default(), &PlayerId::from("nobody"), sink)
            .await;
    }

    #[tokio::test]
    async fn disconnect_of_one_side_settles_as_a_forfeit_and_clears_indices() {
        let (orchestrator, users, matches) = harness();
        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: entry("alice", 1500),
            player2: Some(entry("bob", 1500)),
            mode: Mode::Ranked,
            is_bot: false,
        };
        let match_id = pending.match_id;
        OrchestratorPort::accept(&*orchestrator, pending).await;

        let bob_sink = RecordingSink::new();
        orchestrator
            .register_sink(match_id, &PlayerId::from("bob"), bob_sink.clone())
            .await;

        orchestrator.handle_disconnect(match_id, &PlayerId::from("alice")).await;

        assert!(orchestrator.session_for_player(&PlayerId::from("alice")).await.is_none());
        assert!(orchestrator.session_for_player(&PlayerId::from("bob")).await.is_none());
        assert_eq!(matches.len(), 1);

        let bob_elo = users.get(&PlayerId::from("bob")).await.unwrap().elo;
        assert_eq!(bob_elo, 1500 + FORFEIT_ELO_DELTA);
        let result = bob_sink.ended.lock().unwrap().clone().unwrap();
        assert_eq!(result.result, Outcome::Win);
    }

    #[tokio::test]
    async fn double_disconnect_settles_once_and_is_idempotent() {
        let (orchestrator, _users, matches) = harness();
        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: entry("alice", 1500),
            player2: Some(entry("bob", 1500)),
            mode: Mode::Training,
            is_bot: false,
        };
        let match_id = pending.match_id;
        OrchestratorPort::accept(&*orchestrator, pending).await;

        orchestrator.handle_disconnect(match_id, &PlayerId::from("alice")).await;
        orchestrator.handle_disconnect(match_id, &PlayerId::from("bob")).await;

        assert_eq!(matches.len(), 1, "second settle() call must be a no-op");
    }

    #[tokio::test]
    async fn bot_match_accept_never_waits_on_a_second_human_registration() {
        let (orchestrator, _users, _matches) = harness();
        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: entry("carol", 1500),
            player2: None,
            mode: Mode::Training,
            is_bot: true,
        };
        let match_id = pending.match_id;
        OrchestratorPort::accept(&*orchestrator, pending).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        // `start()` doesn't block on waiting for a bot's own registration;
        // the session must already have moved past `preparing`.
        let session = orchestrator.session_for(match_id).await.unwrap();
        assert_ne!(session.lock().await.state, SessionState::Preparing);
    }

    #[tokio::test]
    async fn completing_every_word_advances_the_cursor_and_settles_on_the_last_one() {
        let (orchestrator, _users, matches) = harness();
        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: entry("alice", 1500),
            player2: Some(entry("bob", 1500)),
            mode: Mode::Training,
            is_bot: false,
        };
        let match_id = pending.match_id;
        OrchestratorPort::accept(&*orchestrator, pending).await;

        let session = orchestrator.session_for(match_id).await.unwrap();
        session.lock().await.state = SessionState::Active;

        let total_words = session.lock().await.words.len();
        for word_index in 0..total_words {
            orchestrator
                .handle_word_complete(match_id, &PlayerId::from("alice"), word_index)
                .await;
            if word_index + 1 < total_words {
                let guard = session.lock().await;
                assert_eq!(guard.player1.progress.current_word_index, word_index);
                assert_eq!(guard.player1.progress.words_completed as usize, word_index + 1);
                assert_eq!(guard.state, SessionState::Active, "must not settle before the final word");
            }
        }

        assert_eq!(matches.len(), 1, "completing the final word must trigger endGame immediately");
        assert!(orchestrator.session_for(match_id).await.is_none());
    }

    #[tokio::test]
    async fn opponent_progress_reports_the_advancing_word_index_after_word_complete() {
        let (orchestrator, _users, _matches) = harness();
        let pending = PendingMatch {
            match_id: MatchId::default(),
            player1: entry("alice", 1500),
            player2: Some(entry("bob", 1500)),
            mode: Mode::Training,
            is_bot: false,
        };
        let match_id = pending.match_id;
        OrchestratorPort::accept(&*orchestrator, pending).await;

        let bob_sink = RecordingSink::new();
        orchestrator.register_sink(match_id, &PlayerId::from("bob"), bob_sink.clone()).await;

        let session = orchestrator.session_for(match_id).await.unwrap();
        session.lock().await.state = SessionState::Active;
        let word_text = session.lock().await.word_text.clone();

        // Complete words 0 and 1 before ever typing a keystroke, so the
        // word cursor has somewhere to advance to other than its initial 0.
        orchestrator.handle_word_complete(match_id, &PlayerId::from("alice"), 0).await;
        orchestrator.handle_word_complete(match_id, &PlayerId::from("alice"), 1).await;

        let next_char_index = word_text.find(' ').map(|i| i + 1).unwrap_or(0) as CharIndex;
        let next_char = word_text.chars().nth(next_char_index as usize).unwrap();
        orchestrator
            .handle_keystroke(match_id, &PlayerId::from("alice"), next_char, 100, next_char_index)
            .await;

        let progress = bob_sink.progress.lock().unwrap().clone();
        assert_eq!(
            progress.last().map(|(_, word_index)| *word_index),
            Some(1),
            "opponent progress must carry the advancing word cursor, not stay pinned at 0"
        );
    }
}
