//! Collaborator port traits the matchmaking and match-execution core
//! depends on but does not implement: identity verification, persistent
//! user/match records, the social graph, audit logging, leaderboard
//! standing, and the shared queue/lock store. Each trait ships an
//! in-memory test double so `tl-matchmaking`/`tl-match` are exercisable
//! without a live Redis or Postgres, mirroring the teacher's
//! `Hydrate`/`Streamable` port-trait style (`rbp-pg`, `rbp-database`).
pub mod audit;
pub mod friends;
pub mod identity;
pub mod leaderboard;
pub mod match_store;
pub mod user;
pub mod queue;

pub use audit::{AuditEvent, AuditSink, LoggingAuditSink};
pub use friends::{FriendGraph, InMemoryFriendGraph};
pub use identity::{AuthError, IdentityProvider, StaticTokenProvider};
pub use leaderboard::{InMemoryLeaderboard, LeaderboardBonus, LeaderboardQuery};
pub use match_store::{InMemoryMatchStore, MatchRecord, MatchStore};
pub use queue::{InMemoryQueueStore, QueueStore};
pub use user::{InMemoryUserStore, StatsPatch, UserRecord, UserStore};
