//! Word-list challenge generator for typeline matches.
//!
//! Draws [`tl_core::WORD_COUNT`] tokens from a fixed English vocabulary for
//! each match. Pure and reentrant: no shared state, no I/O.
mod vocabulary;

use rand::seq::SliceRandom;
use rand::Rng;
use tl_core::WORD_COUNT;

pub use vocabulary::VOCABULARY;

/// Produces the 50-word challenge list and its space-joined `WordText`.
pub struct WordSource;

impl WordSource {
    /// Draws `WORD_COUNT` words without replacement where the vocabulary is
    /// long enough; once the bag is exhausted it reshuffles and continues,
    /// avoiding an immediate repeat across the reshuffle boundary.
    pub fn generate(rng: &mut impl Rng) -> Vec<String> {
        let mut words = Vec::with_capacity(WORD_COUNT);
        let mut bag: Vec<&str> = VOCABULARY.to_vec();
        bag.shuffle(rng);
        let mut cursor = 0;
        while words.len() < WORD_COUNT {
            if cursor >= bag.len() {
                let previous = words.last().cloned();
                loop {
                    bag.shuffle(rng);
                    cursor = 0;
                    if previous.as_deref() != bag.first().copied() {
                        break;
                    }
                }
            }
            words.push(bag[cursor].to_string());
            cursor += 1;
        }
        words
    }

    /// Joins a word list into the single-space-delimited challenge text.
    pub fn join(words: &[String]) -> String {
        words.join(" ")
    }
}
