//! Bridges one connected WebSocket to the matchmaking and match-execution
//! core. Grounded directly in the teacher's `Casino::bridge`: an outbound
//! channel drained opposite an inbound `actix_ws::MessageStream` in a
//! single `tokio::select!` loop, so nothing else ever writes to this
//! socket directly.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, OnceCell};

use tl_core::{CharIndex, Elo, MatchId, Millis, Mode, PlayerId, Rank, WordIndex};
use tl_match::{MatchOrchestrator, MatchSink};
use tl_matchmaking::{EnqueueError, MatchmakingCoordinator, PairingSink, PendingMatch, QueueEntry};
use tl_protocol::{ClientMessage, ErrorCode, MatchResult, OpponentProfile, Protocol, ServerMessage, BACKSPACE};

use crate::ip_gate::IpLease;
use crate::rate_limit::RateLimiter;
use crate::Services;

/// Per-connection delivery surface, playing both [`MatchSink`] (once
/// paired into a session) and [`PairingSink`] (while queued) roles — the
/// teacher's `Client` plays the same dual role against its `Player` and
/// room-admission interfaces.
struct SessionSink {
    player_id: PlayerId,
    display_name: String,
    photo_ref: Option<String>,
    elo: Elo,
    equipped_cursor: String,
    equipped_effect: Option<String>,
    tx: mpsc::UnboundedSender<String>,
    alive: Arc<AtomicBool>,
    orchestrator: Arc<MatchOrchestrator>,
    match_id: std::sync::Mutex<Option<MatchId>>,
    self_ref: OnceCell<Arc<SessionSink>>,
}

#[allow(clippy::too_many_arguments)]
impl SessionSink {
    fn new(
        player_id: PlayerId,
        display_name: String,
        photo_ref: Option<String>,
        elo: Elo,
        equipped_cursor: String,
        equipped_effect: Option<String>,
        tx: mpsc::UnboundedSender<String>,
        alive: Arc<AtomicBool>,
        orchestrator: Arc<MatchOrchestrator>,
    ) -> Arc<Self> {
        let sink = Arc::new(Self {
            player_id,
            display_name,
            photo_ref,
            elo,
            equipped_cursor,
            equipped_effect,
            tx,
            alive,
            orchestrator,
            match_id: std::sync::Mutex::new(None),
            self_ref: OnceCell::new(),
        });
        sink.self_ref
            .set(sink.clone())
            .unwrap_or_else(|_| unreachable!("self_ref set exactly once, at construction"));
        sink
    }

    fn arc(&self) -> Arc<Self> {
        self.self_ref.get().expect("self_ref set at construction").clone()
    }

    fn send(&self, message: ServerMessage) {
        if self.tx.send(message.to_json()).is_err() {
            self.alive.store(false, Ordering::SeqCst);
        }
    }

    fn current_match(&self) -> Option<MatchId> {
        *self.match_id.lock().expect("session sink lock poisoned")
    }

    fn queue_entry(&self) -> QueueEntry {
        QueueEntry {
            player_id: self.player_id.clone(),
            elo: self.elo,
            display_name: self.display_name.clone(),
            photo_ref: self.photo_ref.clone(),
            joined_at: 0,
            equipped_cursor: self.equipped_cursor.clone(),
            equipped_effect: self.equipped_effect.clone(),
        }
    }
}

#[async_trait]
impl MatchSink for SessionSink {
    async fn on_game_start(&self, scheduled_start_time_ms: Millis, duration_seconds: u64) {
        self.send(ServerMessage::GameStart { scheduled_start_time_ms, duration_seconds });
    }

    async fn on_opponent_progress(&self, char_index: CharIndex, word_index: WordIndex) {
        self.send(ServerMessage::OpponentProgress { char_index, word_index });
    }

    async fn on_game_end(&self, result: Arc<MatchResult>) {
        *self.match_id.lock().expect("session sink lock poisoned") = None;
        self.send(ServerMessage::GameEnd { result: Box::new((*result).clone()) });
    }

    async fn on_invalid_keystroke(&self, reason: String) {
        self.send(ServerMessage::error(ErrorCode::InvalidKeystroke, reason));
    }
}

#[async_trait]
impl PairingSink for SessionSink {
    async fn on_match_found(&self, pending: &PendingMatch, words: &[String]) {
        *self.match_id.lock().expect("session sink lock poisoned") = Some(pending.match_id);

        // `pending` is shared verbatim between both recipients of this
        // callback, so `player1` is only "me" if I'm the side that
        // initiated the pairing — otherwise the opponent shown to me is
        // `player1` itself.
        let opponent = if pending.player1.player_id == self.player_id {
            match &pending.player2 {
                Some(entry) => OpponentProfile {
                    display_name: entry.display_name.clone(),
                    photo_url: entry.photo_ref.clone(),
                    is_bot: false,
                    rank: Rank::from_elo(entry.elo),
                    elo: entry.elo,
                    equipped_cursor: entry.equipped_cursor.clone(),
                    equipped_effect: entry.equipped_effect.clone(),
                },
                None => OpponentProfile {
                    display_name: "Bot".to_string(),
                    photo_url: None,
                    is_bot: true,
                    rank: Rank::from_elo(pending.player1.elo),
                    elo: pending.player1.elo,
                    equipped_cursor: "default".to_string(),
                    equipped_effect: None,
                },
            }
        } else {
            OpponentProfile {
                display_name: pending.player1.display_name.clone(),
                photo_url: pending.player1.photo_ref.clone(),
                is_bot: false,
                rank: Rank::from_elo(pending.player1.elo),
                elo: pending.player1.elo,
                equipped_cursor: pending.player1.equipped_cursor.clone(),
                equipped_effect: pending.player1.equipped_effect.clone(),
            }
        };

        self.send(ServerMessage::MatchFound {
            match_id: pending.match_id,
            opponent,
            words: words.to_vec(),
            mode: pending.mode,
        });
        self.orchestrator.register_sink(pending.match_id, &self.player_id, self.arc()).await;
    }

    async fn on_queue_update(&self, position: u32, elapsed_seconds: u64) {
        self.send(ServerMessage::QueueUpdate { position, elapsed_seconds });
    }
}

fn now_ms() -> Millis {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_millis() as Millis
}

async fn join(
    mode: Mode,
    friend_ids: Vec<PlayerId>,
    queued_mode: &mut Option<Mode>,
    sink: &Arc<SessionSink>,
    matchmaking: &Arc<MatchmakingCoordinator>,
) {
    if queued_mode.is_some() {
        sink.send(ServerMessage::error(ErrorCode::MatchError, "already queued"));
        return;
    }
    let entry = sink.queue_entry();
    let pairing_sink: Arc<dyn PairingSink> = sink.clone();
    match matchmaking.enqueue(entry, mode, friend_ids, pairing_sink).await {
        Ok(()) => *queued_mode = Some(mode),
        Err(EnqueueError::NoFriends) => {
            sink.send(ServerMessage::error(ErrorCode::NoFriends, "no friends to match against"));
        }
        Err(EnqueueError::AlreadyQueued) => {
            sink.send(ServerMessage::error(ErrorCode::MatchError, "already queued in another mode"));
        }
    }
}

async fn handle_inbound(raw: &str, player: &PlayerId, queued_mode: &mut Option<Mode>, sink: &Arc<SessionSink>, services: &Arc<Services>) {
    let message = match Protocol::decode(raw) {
        Ok(message) => message,
        Err(err) => {
            log::debug!("session {player}: malformed frame: {err}");
            return;
        }
    };

    match message {
        ClientMessage::JoinQueue => {
            join(Mode::Ranked, Vec::new(), queued_mode, sink, &services.matchmaking).await;
        }
        ClientMessage::JoinTrainingQueue => {
            join(Mode::Training, Vec::new(), queued_mode, sink, &services.matchmaking).await;
        }
        ClientMessage::JoinFriendsQueue => {
            let friend_ids = services.friends.friends_of(player).await;
            join(Mode::Friends, friend_ids, queued_mode, sink, &services.matchmaking).await;
        }
        ClientMessage::LeaveQueue => {
            if let Some(mode) = queued_mode.take() {
                let _ = services.matchmaking.leave_queue(player, mode).await;
            }
        }
        ClientMessage::Keystroke { char, timestamp, char_index } => {
            let Some(match_id) = sink.current_match() else {
                return;
            };
            if char == BACKSPACE {
                services.orchestrator.handle_backspace(match_id, player, char_index).await;
            } else if let Some(ch) = char.chars().next() {
                services.orchestrator.handle_keystroke(match_id, player, ch, timestamp, char_index).await;
            }
        }
        ClientMessage::WordComplete { word_index } => {
            if let Some(match_id) = sink.current_match() {
                services.orchestrator.handle_word_complete(match_id, player, word_index).await;
            }
        }
        ClientMessage::Ping => {
            sink.send(ServerMessage::Pong { server_time_ms: now_ms() });
        }
    }
}

/// Drives one WebSocket connection end to end: registers presence,
/// bridges outbound server frames against inbound client frames, and
/// tears the session down (forfeit or queue withdrawal) when the socket
/// closes.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    player: PlayerId,
    display_name: String,
    photo_ref: Option<String>,
    elo: Elo,
    equipped_cursor: String,
    equipped_effect: Option<String>,
    services: Arc<Services>,
    mut ws_session: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
    _ip_lease: IpLease,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let alive = Arc::new(AtomicBool::new(true));
    let sink = SessionSink::new(
        player.clone(),
        display_name.clone(),
        photo_ref,
        elo,
        equipped_cursor,
        equipped_effect,
        tx.clone(),
        alive,
        services.orchestrator.clone(),
    );
    services.presence.register(player.clone(), display_name, tx).await;

    let mut rate_limiter = RateLimiter::new(services.config.rate_limit_window, services.config.rate_limit_max_messages);
    let mut queued_mode: Option<Mode> = None;

    log::debug!("session {player} connected");

    'sesh: loop {
        tokio::select! {
            biased;
            outbound = rx.recv() => match outbound {
                Some(json) => {
                    if ws_session.text(json).await.is_err() {
                        break 'sesh;
                    }
                }
                None => break 'sesh,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(actix_ws::Message::Text(text))) => {
                    if !rate_limiter.admit() {
                        sink.send(ServerMessage::error(ErrorCode::RateLimitExceeded, "too many messages"));
                        continue 'sesh;
                    }
                    handle_inbound(text.as_ref(), &player, &mut queued_mode, &sink, &services).await;
                }
                Some(Ok(actix_ws::Message::Ping(bytes))) => {
                    let _ = ws_session.pong(&bytes).await;
                }
                Some(Ok(actix_ws::Message::Close(_))) | None => break 'sesh,
                Some(Ok(_)) => continue 'sesh,
                Some(Err(_)) => break 'sesh,
            },
        }
    }

    services.presence.unregister(&player).await;
    if let Some(match_id) = sink.current_match() {
        services.orchestrator.handle_disconnect(match_id, &player).await;
    } else if let Some(mode) = queued_mode {
        let _ = services.matchmaking.leave_queue(&player, mode).await;
    }
    log::debug!("session {player} disconnected");
}
