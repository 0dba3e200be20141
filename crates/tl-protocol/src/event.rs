use crate::MatchResult;
use crate::OpponentProfile;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;
use tl_core::CharIndex;
use tl_core::MatchId;
use tl_core::Millis;
use tl_core::Mode;
use tl_core::WordIndex;

/// Process-local signal delivered from a `MatchSession` (or the
/// matchmaking coordinator) to a player's session adapter. Never
/// serialized directly — [`crate::Protocol::encode`] turns the ones that
/// are client-visible into a [`crate::ServerMessage`]; the rest are
/// orchestrator-internal (e.g. [`Event::Disconnect`]).
#[derive(Clone, Debug)]
pub enum Event {
    QueueUpdate {
        position: u32,
        elapsed_seconds: u64,
    },
    MatchFound {
        match_id: MatchId,
        opponent: OpponentProfile,
        words: Vec<String>,
        mode: Mode,
    },
    GameStart {
        scheduled_start_time_ms: Millis,
        duration_seconds: u64,
    },
    OpponentProgress {
        char_index: CharIndex,
        word_index: WordIndex,
    },
    /// Wrapped in an `Arc` because both sides of a match frequently
    /// reference the same settlement moment in logs and retries without
    /// needing their own copy.
    GameEnd {
        result: Arc<MatchResult>,
    },
    InvalidKeystroke {
        reason: String,
    },
    /// This side's connection dropped; the owning task should treat this
    /// as a forfeit trigger and stop forwarding further events.
    Disconnect,
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::QueueUpdate {
                position,
                elapsed_seconds,
            } => write!(f, "queue_update(pos={position}, elapsed={elapsed_seconds}s)"),
            Event::MatchFound { match_id, mode, .. } => {
                write!(f, "match_found({match_id}, mode={mode})")
            }
            Event::GameStart {
                scheduled_start_time_ms,
                duration_seconds,
            } => write!(
                f,
                "game_start(at={scheduled_start_time_ms}, dur={duration_seconds}s)"
            ),
            Event::OpponentProgress {
                char_index,
                word_index,
            } => write!(f, "opponent_progress(char={char_index}, word={word_index})"),
            Event::GameEnd { result } => write!(f, "game_end({})", result.match_id),
            Event::InvalidKeystroke { reason } => write!(f, "invalid_keystroke({reason})"),
            Event::Disconnect => write!(f, "disconnect"),
        }
    }
}
