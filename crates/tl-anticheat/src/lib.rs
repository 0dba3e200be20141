//! Keystroke validation and per-player stat computation for typeline matches.
//!
//! Pure with respect to I/O: every function here takes and mutates plain
//! state and returns a plain outcome. The caller (the match orchestrator)
//! is responsible for routing the outcome to a client notification.
use tl_core::CharIndex;
use tl_core::Millis;
use tl_core::Stat;
use tl_core::MAX_SANE_WPM;
use tl_core::MIN_KEYSTROKE_INTERVAL_MS;

/// A single accepted keystroke. Backspaces are never recorded here — they
/// rewind position without entering the log (see [`AntiCheat::apply_backspace`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keystroke {
    pub char: char,
    pub timestamp_ms: Millis,
    pub char_index: CharIndex,
}

/// Mutable per-player typing state that [`AntiCheat`] validates against and
/// updates. Owned by the match orchestrator's `PlayerState`.
#[derive(Debug, Clone, Default)]
pub struct TypingProgress {
    pub keystrokes: Vec<Keystroke>,
    pub current_char_index: CharIndex,
    pub current_word_index: usize,
    pub chars_typed: u32,
    pub words_completed: u32,
    pub errors: u32,
    /// Monotonic dedupe key; `-1` before any keystroke has been accepted.
    pub last_processed_char_index: CharIndex,
}

impl TypingProgress {
    pub fn new() -> Self {
        Self {
            last_processed_char_index: -1,
            ..Default::default()
        }
    }
}

/// Why a candidate keystroke was rejected with a client-visible error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// `timestamp - previous.timestamp < MIN_KEYSTROKE_INTERVAL_MS`.
    InvalidLatency,
}

/// Result of validating one candidate keystroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationOutcome {
    /// Recorded. `is_error` is true when the typed char didn't match the
    /// target text at `char_index` (counts toward `Errors`, not rejected).
    Accepted { is_error: bool },
    /// `char_index <= last_processed_char_index`: a reordered or retried
    /// packet, not cheating. No mutation; caller must not emit an error.
    Duplicate,
    /// Rejected outright; caller should emit an `INVALID_KEYSTROKE` notice.
    Rejected(ValidationError),
}

/// Flags raised by [`AntiCheat::audit_flags`]. Observational only — never
/// blocks acceptance or rewrites a computed score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuditFlags {
    pub wpm_exceeds_max_sane: bool,
    pub low_keystroke_variance: bool,
}

impl AuditFlags {
    pub fn any(&self) -> bool {
        self.wpm_exceeds_max_sane || self.low_keystroke_variance
    }
}

/// Final, settlement-time stats for one participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStats {
    pub wpm: Stat,
    pub accuracy: Stat,
    pub score: Stat,
}

pub struct AntiCheat;

impl AntiCheat {
    /// Validates one candidate keystroke against `progress` and `word_text`,
    /// mutating `progress` on acceptance. `word_text` is the match's full
    /// space-joined challenge string; `char_index` indexes into it.
    pub fn validate_keystroke(
        progress: &mut TypingProgress,
        word_text: &str,
        char: char,
        timestamp_ms: Millis,
        char_index: CharIndex,
    ) -> ValidationOutcome {
        if char_index <= progress.last_processed_char_index {
            return ValidationOutcome::Duplicate;
        }
        if let Some(previous) = progress.keystrokes.last() {
            if timestamp_ms - previous.timestamp_ms < MIN_KEYSTROKE_INTERVAL_MS {
                return ValidationOutcome::Rejected(ValidationError::InvalidLatency);
            }
        }
        let is_error = word_text.chars().nth(char_index.max(0) as usize) != Some(char);
        progress.keystrokes.push(Keystroke {
            char,
            timestamp_ms,
            char_index,
        });
        progress.last_processed_char_index = char_index;
        progress.current_char_index = char_index + 1;
        progress.chars_typed += 1;
        if is_error {
            progress.errors += 1;
        }
        ValidationOutcome::Accepted { is_error }
    }

    /// Applies a backspace. Never validated, never recorded as a keystroke —
    /// only rewinds position. `char_index` is the position the backspace
    /// leaves the cursor at (the caller's post-delete index).
    pub fn apply_backspace(progress: &mut TypingProgress, char_index: CharIndex) {
        progress.current_char_index = char_index;
        progress.last_processed_char_index = char_index - 1;
    }

    /// Advances `words_completed` and `current_word_index` on a validated
    /// `WORD_COMPLETE` message. Caller is responsible for the
    /// monotonicity/range check (§4.6.5); this just performs the
    /// assignment once validated, mirroring `game.py:630`'s advance of
    /// its own word cursor right after that same check.
    pub fn complete_word(progress: &mut TypingProgress, word_index: usize) {
        progress.words_completed = (word_index + 1) as u32;
        progress.current_word_index = word_index;
    }

    /// `elapsed = max(0.1, ended - started)` seconds;
    /// `netWords = max(0, (charsTyped - errors) / 5)`;
    /// `WPM = netWords * 60 / elapsed`.
    pub fn wpm(chars_typed: u32, errors: u32, elapsed_seconds: f64) -> Stat {
        let elapsed = elapsed_seconds.max(0.1);
        let net_words = ((chars_typed as f64 - errors as f64) / 5.0).max(0.0);
        net_words * 60.0 / elapsed
    }

    /// `Accuracy = 100 * (charsTyped - errors) / max(1, charsTyped)`.
    pub fn accuracy(chars_typed: u32, errors: u32) -> Stat {
        let denom = chars_typed.max(1) as f64;
        100.0 * (chars_typed as f64 - errors as f64) / denom
    }

    /// `Score = WPM*100 + Accuracy*10 + WordsCompleted*5`, rounded to one
    /// decimal. Shared between humans and bots so comparisons stay faithful.
    pub fn score(wpm: Stat, accuracy: Stat, words_completed: u32) -> Stat {
        let raw = wpm * 100.0 + accuracy * 10.0 + words_completed as f64 * 5.0;
        (raw * 10.0).round() / 10.0
    }

    /// Computes final `PlayerStats` from raw counters and elapsed time.
    pub fn stats(chars_typed: u32, errors: u32, words_completed: u32, elapsed_seconds: f64) -> PlayerStats {
        let wpm = Self::wpm(chars_typed, errors, elapsed_seconds);
        let accuracy = Self::accuracy(chars_typed, errors);
        let score = Self::score(wpm, accuracy, words_completed);
        PlayerStats { wpm, accuracy, score }
    }

    /// Observational flags: WPM above the max-sane threshold, or an
    /// implausibly low coefficient of variation across inter-keystroke
    /// gaps (bots/macros tend to be suspiciously regular). Never mutates
    /// the score.
    pub fn audit_flags(stats: &PlayerStats, progress: &TypingProgress) -> AuditFlags {
        AuditFlags {
            wpm_exceeds_max_sane: stats.wpm > MAX_SANE_WPM,
            low_keystroke_variance: Self::coefficient_of_variation(progress)
                .map(|cv| cv < 0.1)
                .unwrap_or(false),
        }
    }

    fn coefficient_of_variation(progress: &TypingProgress) -> Option<f64> {
        if progress.keystrokes.len() < 3 {
            return None;
        }
        let gaps: Vec<f64> = progress
            .keystrokes
            .windows(2)
            .map(|w| (w[1].timestamp_ms - w[0].timestamp_ms) as f64)
            .collect();
        let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
        if mean <= 0.0 {
            return None;
        }
        let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
        Some(variance.sqrt() / mean)
    }
}
