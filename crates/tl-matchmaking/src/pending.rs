//! A confirmed pairing's hand-off shape to the match-execution core, and
//! the port it is handed across.
//!
//! [`OrchestratorPort`] is the narrow interface `tl-match`'s
//! `MatchOrchestrator` implements; `tl-matchmaking` depends only on the
//! trait, never on the concrete orchestrator, so the two crates don't
//! form a cycle even though the orchestrator itself calls back into this
//! crate's `cleanup_after_match` at settlement.
use async_trait::async_trait;
use tl_core::{MatchId, Mode};

use crate::entry::QueueEntry;

/// Lives only until the orchestrator acknowledges creation. `player2` is
/// `None` iff `is_bot`. `match_id` is minted by the coordinator at the
/// instant a pairing is confirmed, per SPEC_FULL.md §3 — the orchestrator
/// never mints its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMatch {
    pub match_id: MatchId,
    pub player1: QueueEntry,
    pub player2: Option<QueueEntry>,
    pub mode: Mode,
    pub is_bot: bool,
}

/// What `MatchmakingCoordinator::create_match`/`try_create_bot_match`
/// hand a confirmed pairing to. Implemented by `tl-match`'s
/// `MatchOrchestrator`, which creates the session and immediately
/// schedules its synchronized start.
///
/// Returns the generated word list so the coordinator can fold it into
/// the `MATCH_FOUND` frame it sends both sides — the orchestrator is the
/// only party that knows `Words` (it owns `tl-words`), but the wire
/// message carrying them is the coordinator's to send.
#[async_trait]
pub trait OrchestratorPort: Send + Sync {
    async fn accept(&self, pending: PendingMatch) -> Vec<String>;
}
