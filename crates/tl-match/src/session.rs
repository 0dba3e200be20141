//! The match state machine and the per-side data it carries.
//!
//! Deliberately a plain enum-tagged struct rather than the teacher's
//! full typestate generics (`rbp-gameroom::Engine<Phase>`): the forfeit
//! transition reaches in from three different states (`preparing`,
//! `waiting`, `active`), which under a `PhantomData`-per-phase encoding
//! would mean three near-identical impls. A single `SessionState` field
//! plus guarded transitions in [`crate::orchestrator::MatchOrchestrator`]
//! says the same thing once.
use std::sync::Arc;

use tl_anticheat::TypingProgress;
use tl_bot::{BotHandle, BotSimulator};
use tl_core::{Elo, MatchId, Millis, Mode, PlayerId};

use crate::sink::MatchSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Preparing,
    Waiting,
    Active,
    Finished,
}

/// A human participant: identity, cosmetic/profile fields carried over
/// from the matchmaking `QueueEntry`, live typing progress, and the
/// callback surface registered once their client connects to the
/// session.
pub struct HumanSide {
    pub player_id: PlayerId,
    pub display_name: String,
    pub photo_ref: Option<String>,
    pub elo: Elo,
    pub equipped_cursor: String,
    pub equipped_effect: Option<String>,
    pub progress: TypingProgress,
    pub sink: Option<Arc<dyn MatchSink>>,
}

impl HumanSide {
    pub fn registered(&self) -> bool {
        self.sink.is_some()
    }
}

/// A bot opponent. Its own `TypingProgress` isn't tracked through
/// `AntiCheat` at all — the simulator is trusted and tracks its own
/// counters, readable live through `handle`.
///
/// `simulator` is taken out of the session the moment its run loop is
/// spawned (`Option::take`): the 30-second run can't hold the session's
/// mutex, since that would block keystroke routing for the human side
/// for the whole match. `None` after that point means "running
/// elsewhere". `handle` is created alongside the simulator, before it's
/// taken, so settlement can always stop the bot and read its current
/// totals regardless of whether the run task has finished yet.
pub struct BotSide {
    pub simulator: Option<BotSimulator>,
    pub handle: BotHandle,
}

pub enum Side {
    Human(HumanSide),
    Bot(BotSide),
}

impl Side {
    pub fn as_human(&self) -> Option<&HumanSide> {
        match self {
            Side::Human(h) => Some(h),
            Side::Bot(_) => None,
        }
    }
    pub fn as_human_mut(&mut self) -> Option<&mut HumanSide> {
        match self {
            Side::Human(h) => Some(h),
            Side::Bot(_) => None,
        }
    }
    pub fn is_bot(&self) -> bool {
        matches!(self, Side::Bot(_))
    }
}

/// One live typing race. `player1` is always human; `side2` is either
/// the paired opponent or a bot, per `PendingMatch::is_bot`.
pub struct MatchSession {
    pub match_id: MatchId,
    pub mode: Mode,
    pub words: Vec<String>,
    pub word_text: String,
    pub state: SessionState,
    pub created_at: Millis,
    pub started_at: Option<Millis>,
    pub ended_at: Option<Millis>,
    /// Guards concurrent `start()` calls independently of `started_at`
    /// (§4.6.3: the guard exists *before* `StartedAt` is ever set).
    pub start_in_progress: bool,
    pub player1: HumanSide,
    pub side2: Side,
}

impl MatchSession {
    /// The human opponent of `player`, if any (`None` against a bot).
    pub fn opponent_of(&mut self, player: &PlayerId) -> Option<&mut HumanSide> {
        if self.player1.player_id == *player {
            self.side2.as_human_mut()
        } else {
            Some(&mut self.player1)
        }
    }

    pub fn side_of_mut(&mut self, player: &PlayerId) -> Option<&mut HumanSide> {
        if self.player1.player_id == *player {
            return Some(&mut self.player1);
        }
        match &mut self.side2 {
            Side::Human(h) if h.player_id == *player => Some(h),
            _ => None,
        }
    }

    pub fn both_registered(&self) -> bool {
        self.player1.registered() && self.side2.as_human().is_none_or(|h| h.registered())
    }
}
