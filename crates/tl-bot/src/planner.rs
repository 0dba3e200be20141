//! Pure per-word action planner: turns a target word into a queue of
//! scheduled actions (type, press-then-correct, wait) without touching
//! any clock or I/O, grounded in
//! `original_source/services/bot.py::TypingBot._queue_next_word_actions`.
use std::time::Duration;

use rand::Rng;

use crate::config::BotConfig;
use crate::qwerty;

/// One scheduled step of the bot's typing.
#[derive(Debug, Clone, PartialEq)]
pub enum BotAction {
    /// Type a correct character, or the space terminating a word.
    Type(char),
    /// Type a wrong character; never reported as progress.
    Press(char),
    /// Pause without producing a keystroke (reaction time, inter-word gap).
    Wait(Duration),
    /// Erase the most recently pressed wrong character.
    Backspace,
}

const SHORT_WORD_LEN: usize = 4;
const LONG_WORD_LEN: usize = 7;
const BURST_SPEED_RANGE: (f64, f64) = (1.1, 1.3);

/// Picks this word's speed multiplier: a burst on short words (subject
/// to `burst_probability`), a slowdown on long words scaled by skill, or
/// neutral pace otherwise.
fn word_speed_multiplier(word: &str, config: &BotConfig, rng: &mut impl Rng) -> f64 {
    let len = word.chars().count();
    if len < SHORT_WORD_LEN && rng.random_range(0.0..1.0) < config.burst_probability {
        rng.random_range(BURST_SPEED_RANGE.0..BURST_SPEED_RANGE.1)
    } else if len > LONG_WORD_LEN {
        let skill_factor = (config.target_wpm / 150.0).min(1.0);
        let min_slow = 0.75 + 0.2 * skill_factor;
        let max_slow = 0.90 + 0.1 * skill_factor;
        rng.random_range(min_slow..max_slow)
    } else {
        1.0
    }
}

/// Plans the full action queue for typing one word, including its
/// trailing space and inter-word pause. Returns the queue plus the
/// speed multiplier chosen for this word (the caller folds a typo
/// correction's speed-up into subsequent delay calculations).
pub fn plan_word(word: &str, config: &BotConfig, rng: &mut impl Rng) -> (Vec<BotAction>, f64) {
    let mut speed_mult = word_speed_multiplier(word, config, rng);
    let mut actions = Vec::new();

    for ch in word.chars() {
        if rng.random_range(0.0..1.0) > config.accuracy {
            let wrong = qwerty::neighbor_key(ch, rng);
            actions.push(BotAction::Press(wrong));
            let reaction = Duration::from_secs_f64(rng.random_range(0.15..0.3));
            actions.push(BotAction::Wait(reaction));
            actions.push(BotAction::Backspace);
            speed_mult *= config.correction_speed;
            actions.push(BotAction::Type(ch));
        } else {
            actions.push(BotAction::Type(ch));
        }
    }

    actions.push(BotAction::Type(' '));

    let base_word_delay = 60.0 / config.target_wpm;
    let word_pause = rng.random_range(0.05..0.15) + base_word_delay * 0.1;
    actions.push(BotAction::Wait(Duration::from_secs_f64(word_pause)));

    (actions, speed_mult)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn perfect_config() -> BotConfig {
        BotConfig {
            target_wpm: 60.0,
            accuracy: 1.0,
            variance: 0.1,
            correction_speed: 1.2,
            burst_probability: 0.0,
        }
    }

    #[test]
    fn perfect_accuracy_never_queues_press_or_backspace() {
        let mut rng = SmallRng::seed_from_u64(1);
        let (actions, _) = plan_word("hello", &perfect_config(), &mut rng);
        assert!(!actions.iter().any(|a| matches!(a, BotAction::Press(_) | BotAction::Backspace)));
    }

    #[test]
    fn every_word_ends_with_a_trailing_space_type() {
        let mut rng = SmallRng::seed_from_u64(2);
        let (actions, _) = plan_word("cat", &perfect_config(), &mut rng);
        let last_type = actions
            .iter()
            .rev()
            .find(|a| matches!(a, BotAction::Type(_)));
        assert_eq!(last_type, Some(&BotAction::Type(' ')));
    }

    #[test]
    fn zero_accuracy_queues_a_press_and_backspace_per_character() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut config = perfect_config();
        config.accuracy = 0.0;
        let (actions, _) = plan_word("cat", &config, &mut rng);
        let presses = actions.iter().filter(|a| matches!(a, BotAction::Press(_))).count();
        let backspaces = actions.iter().filter(|a| matches!(a, BotAction::Backspace)).count();
        assert_eq!(presses, 3);
        assert_eq!(backspaces, 3);
    }

    #[test]
    fn plan_always_ends_with_a_wait() {
        let mut rng = SmallRng::seed_from_u64(4);
        let (actions, _) = plan_word("word", &perfect_config(), &mut rng);
        assert!(matches!(actions.last(), Some(BotAction::Wait(_))));
    }
}
