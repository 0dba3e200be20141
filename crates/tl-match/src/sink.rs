//! The callback surfaces a match session delivers events through.
//!
//! Mirrors the teacher's `Player` trait (`rbp-gameroom::Player`,
//! bridged to a WebSocket by `rbp-hosting::Client`): a narrow interface
//! the transport layer implements once per connected player, so this
//! crate never touches actix-web or a socket directly.
use std::sync::Arc;

use async_trait::async_trait;
use tl_core::{CharIndex, Millis, Mode, Outcome, WordIndex};
use tl_protocol::MatchResult;

/// Per-player delivery surface. `tl-server` implements this once per
/// connected WebSocket session and registers it via
/// `MatchOrchestrator::register_sink`.
#[async_trait]
pub trait MatchSink: Send + Sync {
    async fn on_game_start(&self, scheduled_start_time_ms: Millis, duration_seconds: u64);
    async fn on_opponent_progress(&self, char_index: CharIndex, word_index: WordIndex);
    async fn on_game_end(&self, result: Arc<MatchResult>);
    async fn on_invalid_keystroke(&self, reason: String);
}

/// Spectator-facing broadcast surface (`PublicMatchStarted` /
/// `PublicMatchEnded` on the wire). Separate from [`MatchSink`] because
/// it has no per-player identity — `tl-server` fans this out to every
/// connected socket, not just the two participants.
#[async_trait]
pub trait PublicSink: Send + Sync {
    async fn on_match_started(&self, mode: Mode, display_names: Vec<String>);
    async fn on_match_ended(&self, mode: Mode, display_names: Vec<String>, outcome: Outcome);
}

/// No-op implementation for orchestrators wired without a broadcast
/// layer (unit tests, or a deployment that doesn't spectate).
pub struct NullPublicSink;

#[async_trait]
impl PublicSink for NullPublicSink {
    async fn on_match_started(&self, _mode: Mode, _display_names: Vec<String>) {}
    async fn on_match_ended(&self, _mode: Mode, _display_names: Vec<String>, _outcome: Outcome) {}
}
