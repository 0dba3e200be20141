//! Drains a per-word action queue on a timer, producing clean
//! opponent-progress callbacks while internally tracking errors for
//! final stat computation. Grounded in
//! `original_source/services/bot.py::TypingBot.run`.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tl_core::{CharIndex, WordIndex};
use tokio::time::{sleep, Instant};

use crate::config::BotConfig;
use crate::planner::{self, BotAction};

const INITIAL_REACTION_RANGE: (f64, f64) = (0.2, 0.5);
const BACKSPACE_DELAY_RANGE: (f64, f64) = (0.08, 0.15);
const SPACE_SETTLE_RANGE: (f64, f64) = (0.01, 0.05);
const MIN_KEYSTROKE_DELAY_SECS: f64 = 0.02;

/// Final tracked stats for a bot's run, independent of the generic
/// anti-cheat pipeline (a bot is trusted; these feed `RatingEngine`
/// directly).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotResult {
    pub chars_typed: i64,
    pub words_completed: u32,
    pub errors: u32,
}

/// The counters a [`BotSimulator`] mutates as it runs, shared with
/// whoever holds a [`BotHandle`] so they can be read (and the run loop
/// told to stop) without waiting for `run()` to return.
struct BotCounters {
    chars_typed: AtomicI64,
    words_completed: AtomicU32,
    errors: AtomicU32,
    stopped: AtomicBool,
}

impl BotCounters {
    fn new() -> Self {
        Self {
            chars_typed: AtomicI64::new(0),
            words_completed: AtomicU32::new(0),
            errors: AtomicU32::new(0),
            stopped: AtomicBool::new(false),
        }
    }
}

/// A cheap, cloneable handle onto a running [`BotSimulator`]'s live
/// counters. Obtained via [`BotSimulator::handle`] *before* the
/// simulator is moved into its own run task, so a settlement path can
/// read the bot's current totals and request a stop without needing
/// the simulator itself (which may be mid-`run()` on another task).
#[derive(Clone)]
pub struct BotHandle(Arc<BotCounters>);

impl BotHandle {
    /// The bot's current totals, live — valid whether `run()` is still
    /// in progress, has been stopped, or ran to completion.
    pub fn result(&self) -> BotResult {
        BotResult {
            chars_typed: self.0.chars_typed.load(Ordering::SeqCst),
            words_completed: self.0.words_completed.load(Ordering::SeqCst),
            errors: self.0.errors.load(Ordering::SeqCst),
        }
    }

    /// Requests that the run loop exit at its next iteration.
    /// Idempotent: calling this after the simulator has already
    /// stopped (by duration, exhaustion, or an earlier `stop()`) is a
    /// no-op (§4.4 Contract).
    pub fn stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
    }
}

/// Simulates one bot opponent typing a fixed word list for the match
/// duration, reporting clean progress through a caller-supplied sink.
pub struct BotSimulator {
    config: BotConfig,
    words: Vec<String>,
    current_word_index: WordIndex,
    current_char_index: CharIndex,
    current_speed_mult: f64,
    queue: VecDeque<BotAction>,
    counters: Arc<BotCounters>,
}

impl BotSimulator {
    pub fn new(config: BotConfig, words: Vec<String>) -> Self {
        Self {
            config,
            words,
            current_word_index: 0,
            current_char_index: 0,
            current_speed_mult: 1.0,
            queue: VecDeque::new(),
            counters: Arc::new(BotCounters::new()),
        }
    }

    /// A handle onto this simulator's live counters, safe to hold (and
    /// read from) after the simulator itself has been moved into a
    /// spawned `run()` task.
    pub fn handle(&self) -> BotHandle {
        BotHandle(self.counters.clone())
    }

    fn base_delay(&self) -> f64 {
        12.0 / (self.config.target_wpm * self.current_speed_mult)
    }

    fn jittered_delay(&self, rng: &mut impl Rng) -> Duration {
        let base = self.base_delay();
        let normal = Normal::new(0.0, base * self.config.variance).unwrap_or_else(|_| {
            Normal::new(0.0, 0.001).expect("fixed fallback stddev is always valid")
        });
        let jitter = normal.sample(rng);
        Duration::from_secs_f64((base + jitter).max(MIN_KEYSTROKE_DELAY_SECS))
    }

    /// Runs the simulation until `duration` elapses or the word list is
    /// exhausted, invoking `on_progress(char_index, word_index)` once per
    /// cleanly-typed character (never for a typo's keystroke).
    pub async fn run(
        &mut self,
        duration: Duration,
        rng: &mut impl Rng,
        mut on_progress: impl FnMut(CharIndex, WordIndex),
    ) {
        let start = Instant::now();
        sleep(Duration::from_secs_f64(
            rng.random_range(INITIAL_REACTION_RANGE.0..INITIAL_REACTION_RANGE.1),
        ))
        .await;

        loop {
            if self.counters.stopped.load(Ordering::SeqCst) {
                break;
            }
            if start.elapsed() >= duration {
                break;
            }
            if self.queue.is_empty() {
                if self.current_word_index as usize >= self.words.len() {
                    break;
                }
                let word = self.words[self.current_word_index as usize].clone();
                let (actions, speed_mult) = planner::plan_word(&word, &self.config, rng);
                self.current_speed_mult = speed_mult;
                self.queue.extend(actions);
            }
            let Some(action) = self.queue.pop_front() else {
                break;
            };

            match action {
                BotAction::Wait(d) => sleep(d).await,
                BotAction::Type(ch) => {
                    sleep(self.jittered_delay(rng)).await;
                    if ch == ' ' {
                        self.counters.words_completed.fetch_add(1, Ordering::SeqCst);
                        self.current_word_index += 1;
                        self.current_char_index = 0;
                        self.counters.chars_typed.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_secs_f64(
                            rng.random_range(SPACE_SETTLE_RANGE.0..SPACE_SETTLE_RANGE.1),
                        ))
                        .await;
                    } else {
                        self.current_char_index += 1;
                        self.counters.chars_typed.fetch_add(1, Ordering::SeqCst);
                    }
                    on_progress(self.current_char_index, self.current_word_index);
                }
                BotAction::Press(_) => {
                    self.counters.errors.fetch_add(1, Ordering::SeqCst);
                    sleep(self.jittered_delay(rng)).await;
                }
                BotAction::Backspace => {
                    sleep(Duration::from_secs_f64(
                        rng.random_range(BACKSPACE_DELAY_RANGE.0..BACKSPACE_DELAY_RANGE.1),
                    ))
                    .await;
                }
            }
        }
    }

    pub fn result(&self) -> BotResult {
        self.handle().result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn words(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{i}")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_reported_only_on_clean_type_actions() {
        let config = BotConfig {
            target_wpm: 600.0,
            accuracy: 1.0,
            variance: 0.0,
            correction_speed: 1.2,
            burst_probability: 0.0,
        };
        let mut sim = BotSimulator::new(config, words(3));
        let mut rng = SmallRng::seed_from_u64(1);
        let mut reports = 0;
        sim.run(Duration::from_secs(5), &mut rng, |_, _| reports += 1).await;
        assert!(reports > 0);
        assert_eq!(sim.result().errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_accuracy_still_advances_chars_typed_with_recorded_errors() {
        let config = BotConfig {
            target_wpm: 600.0,
            accuracy: 0.0,
            variance: 0.0,
            correction_speed: 1.2,
            burst_probability: 0.0,
        };
        let mut sim = BotSimulator::new(config, words(1));
        let mut rng = SmallRng::seed_from_u64(2);
        sim.run(Duration::from_secs(5), &mut rng, |_, _| {}).await;
        let result = sim.result();
        assert!(result.errors > 0);
        assert!(result.chars_typed > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_duration_even_mid_word_list() {
        let config = BotConfig {
            target_wpm: 10.0,
            accuracy: 1.0,
            variance: 0.0,
            correction_speed: 1.2,
            burst_probability: 0.0,
        };
        let mut sim = BotSimulator::new(config, words(200));
        let mut rng = SmallRng::seed_from_u64(3);
        sim.run(Duration::from_millis(500), &mut rng, |_, _| {}).await;
        assert!((sim.current_word_index as usize) < 200);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_reads_live_counters_while_run_is_in_progress() {
        let config = BotConfig {
            target_wpm: 60.0,
            accuracy: 1.0,
            variance: 0.0,
            correction_speed: 1.2,
            burst_probability: 0.0,
        };
        let mut sim = BotSimulator::new(config, words(50));
        let handle = sim.handle();
        assert_eq!(handle.result().chars_typed, 0);

        let mut rng = SmallRng::seed_from_u64(4);
        let run = tokio::spawn(async move {
            sim.run(Duration::from_secs(30), &mut rng, |_, _| {}).await;
        });
        tokio::time::sleep(Duration::from_secs(10)).await;

        let mid_run = handle.result();
        assert!(mid_run.chars_typed > 0, "counters must be visible before run() returns");

        run.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_the_run_loop_before_duration_elapses() {
        let config = BotConfig {
            target_wpm: 60.0,
            accuracy: 1.0,
            variance: 0.0,
            correction_speed: 1.2,
            burst_probability: 0.0,
        };
        let mut sim = BotSimulator::new(config, words(50));
        let handle = sim.handle();
        let mut rng = SmallRng::seed_from_u64(5);

        let run = tokio::spawn(async move {
            sim.run(Duration::from_secs(30), &mut rng, |_, _| {}).await;
            sim.result()
        });
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.stop();
        let result = tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .expect("run() must return promptly once stopped")
            .unwrap();
        assert!(result.chars_typed > 0);

        // Idempotent: a second stop() after the loop already exited is a no-op.
        handle.stop();
    }
}
