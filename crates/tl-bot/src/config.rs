//! Bot skill configuration derived from the human opponent's rating and
//! recent typing speed, grounded in
//! `original_source/services/bot.py::BotConfig.from_player_stats`.
use rand::Rng;
use tl_core::Elo;

const MIN_TARGET_WPM: f64 = 10.0;
const MAX_TARGET_WPM: f64 = 250.0;
const RANKER_ELO_THRESHOLD: Elo = 3000;
const BURST_PROBABILITY_CAP: f64 = 0.85;
const CORRECTION_SPEED_CAP: f64 = 1.6;

/// Per-bot behavior profile: speed, error rate, timing jitter, and the
/// "smart play" knobs that scale with opponent skill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotConfig {
    pub target_wpm: f64,
    pub accuracy: f64,
    pub variance: f64,
    pub correction_speed: f64,
    pub burst_probability: f64,
}

struct SkillTier {
    wpm: f64,
    accuracy: (f64, f64),
    variance: f64,
}

fn tier_for_wpm(avg_wpm: f64) -> SkillTier {
    if avg_wpm < 30.0 {
        SkillTier { wpm: 35.0, accuracy: (0.88, 0.92), variance: 0.30 }
    } else if avg_wpm < 50.0 {
        SkillTier { wpm: 55.0, accuracy: (0.90, 0.94), variance: 0.25 }
    } else if avg_wpm < 70.0 {
        SkillTier { wpm: 75.0, accuracy: (0.93, 0.96), variance: 0.20 }
    } else if avg_wpm < 90.0 {
        SkillTier { wpm: 95.0, accuracy: (0.95, 0.98), variance: 0.15 }
    } else {
        SkillTier { wpm: 115.0, accuracy: (0.97, 0.99), variance: 0.10 }
    }
}

fn tier_for_elo(elo: Elo) -> SkillTier {
    if elo < 1000 {
        SkillTier { wpm: 35.0, accuracy: (0.88, 0.92), variance: 0.30 }
    } else if elo < 2000 {
        SkillTier { wpm: 55.0, accuracy: (0.90, 0.94), variance: 0.25 }
    } else if elo < 3000 {
        SkillTier { wpm: 75.0, accuracy: (0.93, 0.96), variance: 0.20 }
    } else if elo < 10000 {
        SkillTier { wpm: 95.0, accuracy: (0.95, 0.98), variance: 0.15 }
    } else {
        SkillTier { wpm: 115.0, accuracy: (0.97, 0.99), variance: 0.10 }
    }
}

impl BotConfig {
    /// Derives a bot's skill profile from the human opponent's Elo and,
    /// where known, their average WPM over recent matches.
    ///
    /// Above `RANKER_ELO_THRESHOLD` the bot is deliberately pitched 20-40
    /// WPM above the player's average rather than matched to it, denying
    /// high-Elo players an easy bot farm for rating.
    pub fn from_player_stats(elo: Elo, avg_wpm: Option<f64>, rng: &mut impl Rng) -> Self {
        let tier = match avg_wpm {
            Some(wpm) if wpm > 0.0 => tier_for_wpm(wpm),
            _ => tier_for_elo(elo),
        };

        let target_wpm = match avg_wpm {
            Some(wpm) if wpm > 0.0 => {
                let delta = if elo > RANKER_ELO_THRESHOLD {
                    rng.random_range(20.0..=40.0)
                } else {
                    rng.random_range(-5.0..=10.0)
                };
                (wpm + delta).max(10.0)
            }
            _ => tier.wpm,
        };
        let target_wpm = target_wpm.clamp(MIN_TARGET_WPM, MAX_TARGET_WPM);
        let accuracy = rng.random_range(tier.accuracy.0..=tier.accuracy.1);
        let variance = tier.variance;

        let mut burst_probability: f64 = 0.3;
        let mut correction_speed: f64 = 1.2;

        if target_wpm > 60.0 {
            burst_probability = 0.35;
            correction_speed = 1.25;
        }
        if target_wpm > 90.0 {
            burst_probability = 0.45;
            correction_speed = 1.35;
        }
        if target_wpm > 120.0 {
            burst_probability = 0.55;
            correction_speed = 1.5;
        }

        if elo > 1200 {
            burst_probability += 0.05;
            correction_speed += 0.05;
        }
        if elo > 1800 {
            burst_probability += 0.05;
        }
        if elo > 2400 {
            correction_speed += 0.10;
        }

        Self {
            target_wpm,
            accuracy,
            variance,
            correction_speed: correction_speed.min(CORRECTION_SPEED_CAP),
            burst_probability: burst_probability.min(BURST_PROBABILITY_CAP),
        }
    }
}
