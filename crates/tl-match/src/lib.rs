//! Match-execution core: owns every live race from creation through
//! settlement. One [`orchestrator::MatchOrchestrator`] per process,
//! indexing sessions by both `MatchId` and `PlayerId` for keystroke
//! routing, exactly as the matchmaking side indexes queue entries.
mod orchestrator;
mod session;
mod sink;

pub use orchestrator::MatchOrchestrator;
pub use session::{HumanSide, MatchSession, SessionState, Side};
pub use sink::{MatchSink, PublicSink};
