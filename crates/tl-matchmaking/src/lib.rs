//! Matchmaking coordinator: three independent queues (ranked, training,
//! friends), FIFO pairing under short-TTL distributed locks, and bot
//! fallback on timeout. Ported from `original_source/services/matchmaking.py`.
//!
//! Owns concurrency only during the matchmaking phase — once a pairing is
//! confirmed, a [`PendingMatch`] is handed across the [`OrchestratorPort`]
//! boundary and the match-execution core (`tl-match`) takes over.
mod coordinator;
mod entry;
mod pending;

pub use coordinator::{EnqueueError, MatchmakingCoordinator, PairingSink};
pub use entry::QueueEntry;
pub use pending::{OrchestratorPort, PendingMatch};
