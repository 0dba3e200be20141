//! Core type aliases, identifiers, and constants shared across typeline.
//!
//! This crate provides the foundational types and configuration parameters
//! used throughout the typeline workspace: the matchmaking coordinator, the
//! match orchestrator, the rating engine, and the bot simulator.
#![allow(dead_code)]

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Integer display rating (Elo-scaled Glicko-2 mu).
pub type Elo = i32;
/// Milliseconds since some monotonic or wall-clock epoch, client- or server-supplied.
pub type Millis = i64;
/// Position into a match's word text (0-based character offset).
pub type CharIndex = i32;
/// Index into a match's word list (0-based).
pub type WordIndex = usize;
/// Words-per-minute, accuracy percentage, and score all live on this scale.
pub type Stat = f64;

// ============================================================================
// TRAITS
// ============================================================================
/// Unique identifier trait for domain entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic ID wrapper providing compile-time type safety over uuid::Uuid.
///
/// `ID<MatchSession>` and `ID<Player>` are distinct types even though both
/// wrap the same underlying representation, so a match id can never be
/// passed where a player id is expected.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Cast ID<T> to ID<U> while preserving the underlying UUID.
    pub fn cast<U>(self) -> ID<U> {
        ID {
            inner: self.inner,
            marker: PhantomData,
        }
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl<T> serde::Serialize for ID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}
impl<'de, T> serde::Deserialize<'de> for ID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::from(uuid::Uuid::deserialize(deserializer)?))
    }
}

/// Marker type for `ID<MatchMarker>` — a match's unique identifier.
/// Never constructed; exists only to make `MatchId` distinct from any
/// other `ID<T>` at compile time.
pub struct MatchMarker;
/// Unique identifier for a `MatchSession` / `PendingMatch`.
pub type MatchId = ID<MatchMarker>;

/// Stable identity for a signed-in player, opaque to this crate.
/// Provided by the `IdentityProvider` collaborator, not minted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PlayerId(pub String);

impl Display for PlayerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// RANK
// ============================================================================
/// Banded label derived from an `Elo` rating, used for coin-reward rate and
/// cosmetic unlocks. Boundaries come from `constants.py`'s rank thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Unranked,
    Bronze,
    Gold,
    Platinum,
    Ranker,
}

impl Rank {
    /// Derives a rank band from an Elo rating.
    pub fn from_elo(elo: Elo) -> Self {
        match elo {
            e if e < 1_000 => Rank::Unranked,
            e if e < 2_000 => Rank::Bronze,
            e if e < 3_000 => Rank::Gold,
            e if e < 10_000 => Rank::Platinum,
            _ => Rank::Ranker,
        }
    }
    /// Multiplicative coin-reward bonus rate for this rank.
    pub fn coin_bonus_rate(self) -> f64 {
        match self {
            Rank::Unranked => 0.0,
            Rank::Bronze => 0.20,
            Rank::Gold => 0.40,
            Rank::Platinum => 0.80,
            Rank::Ranker => 1.60,
        }
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Rank::Unranked => "unranked",
            Rank::Bronze => "bronze",
            Rank::Gold => "gold",
            Rank::Platinum => "platinum",
            Rank::Ranker => "ranker",
        };
        write!(f, "{}", s)
    }
}

/// Match mode. Ranked is the only mode with Elo changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Ranked,
    Training,
    Friends,
}

impl Mode {
    pub fn affects_rating(self) -> bool {
        matches!(self, Mode::Ranked)
    }
    /// Whether this queue falls back to a bot opponent on timeout.
    pub fn allows_bot_fallback(self) -> bool {
        matches!(self, Mode::Ranked | Mode::Training)
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Ranked => "ranked",
            Mode::Training => "training",
            Mode::Friends => "friends",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a finished match from one side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::Tie => "tie",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// NORMATIVE CONSTANTS (see SPEC_FULL.md §6.3)
// ============================================================================
/// Number of words dealt per match.
pub const WORD_COUNT: usize = 50;
/// Race duration in seconds.
pub const MATCH_DURATION_SECS: u64 = 30;
/// Delay between `start()` committing a schedule and the race going live.
pub const SYNCHRONIZED_START_DELAY_SECS: u64 = 5;
/// How long `start()` waits for both sides' callbacks to register.
pub const CALLBACK_REGISTRATION_TIMEOUT_SECS: u64 = 15;
/// Poll interval while waiting for callback registration.
pub const CALLBACK_POLL_INTERVAL_MS: u64 = 200;
/// Ranked queue matchmaking timeout before bot fallback.
pub const RANKED_MATCHMAKING_TIMEOUT_SECS: u64 = 60;
/// Training queue matchmaking timeout before bot fallback.
pub const TRAINING_MATCHMAKING_TIMEOUT_SECS: u64 = 5;
/// Search-task poll cadence.
pub const SEARCH_TICK_SECS: u64 = 1;
/// How long a search task waits for its own pairing callback once matched.
pub const MATCHED_CALLBACK_TIMEOUT_SECS: u64 = 10;
/// TTL for a pairing's distributed lock.
pub const PAIRING_LOCK_TTL_SECS: u64 = 2;
/// Candidates considered per FIFO pairing attempt.
pub const PAIRING_CANDIDATE_WINDOW: usize = 10;
/// Inbound message rate-limit window.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 1;
/// Inbound messages allowed per rate-limit window.
pub const RATE_LIMIT_MAX_MESSAGES: u32 = 50;
/// Minimum inter-keystroke interval; faster is rejected as superhuman.
pub const MIN_KEYSTROKE_INTERVAL_MS: i64 = 10;
/// WPM above this is flagged for audit, never rewritten.
pub const MAX_SANE_WPM: Stat = 250.0;
/// Coin reward for a win, before bonuses.
pub const WIN_COIN_REWARD: i64 = 300;
/// Coin reward for a loss, before bonuses.
pub const LOSS_COIN_REWARD: i64 = 50;
/// Symmetric clamp applied to every Elo delta.
pub const ELO_HARD_CAP: Elo = 100;
/// Coin bonus rate for leaderboard top 3.
pub const LEADERBOARD_TOP3_BONUS_RATE: f64 = 0.50;
/// Coin bonus rate for leaderboard top 4..10.
pub const LEADERBOARD_TOP10_BONUS_RATE: f64 = 0.20;
/// Matches played below which the placement bonus applies.
pub const PLACEMENT_MATCH_THRESHOLD: u32 = 10;
/// Fixed Elo swing applied on a ranked PvP forfeit.
pub const FORFEIT_ELO_DELTA: Elo = 10;
/// Pending-matches map capacity before oldest entries are evicted.
pub const PENDING_MATCHES_CAPACITY: usize = 1024;
/// Attempts for bounded-retry notification delivery (GAME_START, GAME_END).
pub const NOTIFICATION_RETRY_ATTEMPTS: u32 = 3;
/// Per-attempt timeout for GAME_START delivery.
pub const GAME_START_RETRY_TIMEOUT_SECS: u64 = 3;
/// Per-attempt timeout for GAME_END delivery.
pub const GAME_END_RETRY_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "server")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Global interrupt flag, flipped by `shutdown()` so every background task
/// (queue search loops, duration timers, bot run loops) can observe it on
/// its next poll and unwind instead of being dropped mid-session.
#[cfg(feature = "server")]
static INTERRUPTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

#[cfg(feature = "server")]
pub fn interrupted() -> bool {
    INTERRUPTED.load(std::sync::atomic::Ordering::Relaxed)
}
#[cfg(not(feature = "server"))]
pub fn interrupted() -> bool {
    false
}

/// Registers the Ctrl+C handler that flips the graceful-shutdown flag.
/// Background loops are expected to check `interrupted()` between ticks;
/// this does not itself kill any task.
#[cfg(feature = "server")]
pub fn shutdown_on_ctrl_c() {
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        log::warn!("shutdown requested, cancelling background tasks");
        INTERRUPTED.store(true, std::sync::atomic::Ordering::Relaxed);
    });
}
