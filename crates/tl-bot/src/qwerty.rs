//! Physical-keyboard-adjacency typo model, grounded in
//! `original_source/services/bot.py::QWERTY_ADJACENCY`.
use rand::Rng;

fn neighbors(lower: char) -> Option<&'static [char]> {
    Some(match lower {
        'q' => &['w', 'a', '1', '2'],
        'w' => &['q', 'e', 's', 'a', '2', '3'],
        'e' => &['w', 'r', 'd', 's', '3', '4'],
        'r' => &['e', 't', 'f', 'd', '4', '5'],
        't' => &['r', 'y', 'g', 'f', '5', '6'],
        'y' => &['t', 'u', 'h', 'g', '6', '7'],
        'u' => &['y', 'i', 'j', 'h', '7', '8'],
        'i' => &['u', 'o', 'k', 'j', '8', '9'],
        'o' => &['i', 'p', 'l', 'k', '9', '0'],
        'p' => &['o', '[', ';', 'l', '0', '-'],
        'a' => &['q', 'w', 's', 'z'],
        's' => &['w', 'e', 'd', 'x', 'z', 'a'],
        'd' => &['e', 'r', 'f', 'c', 'x', 's'],
        'f' => &['r', 't', 'g', 'v', 'c', 'd'],
        'g' => &['t', 'y', 'h', 'b', 'v', 'f'],
        'h' => &['y', 'u', 'j', 'n', 'b', 'g'],
        'j' => &['u', 'i', 'k', 'm', 'n', 'h'],
        'k' => &['i', 'o', 'l', ',', 'm', 'j'],
        'l' => &['o', 'p', ';', '.', ',', 'k'],
        'z' => &['a', 's', 'x'],
        'x' => &['z', 's', 'd', 'c'],
        'c' => &['x', 'd', 'f', 'v'],
        'v' => &['c', 'f', 'g', 'b'],
        'b' => &['v', 'g', 'h', 'n'],
        'n' => &['b', 'h', 'j', 'm'],
        'm' => &['n', 'j', 'k', ','],
        _ => return None,
    })
}

const FALLBACK_ALPHABET: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Picks a plausible mistyped neighbor for `target`, falling back to a
/// uniformly random letter for characters outside the QWERTY alpha block.
pub fn neighbor_key(target: char, rng: &mut impl Rng) -> char {
    let lower = target.to_ascii_lowercase();
    match neighbors(lower) {
        Some(candidates) => candidates[rng.random_range(0..candidates.len())],
        None => FALLBACK_ALPHABET[rng.random_range(0..FALLBACK_ALPHABET.len())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn known_letter_stays_within_its_adjacency_set() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            let k = neighbor_key('a', &mut rng);
            assert!(['q', 'w', 's', 'z'].contains(&k));
        }
    }

    #[test]
    fn unmapped_character_falls_back_to_some_lowercase_letter() {
        let mut rng = SmallRng::seed_from_u64(8);
        let k = neighbor_key('!', &mut rng);
        assert!(k.is_ascii_lowercase());
    }

    #[test]
    fn uppercase_input_is_matched_case_insensitively() {
        let mut rng = SmallRng::seed_from_u64(9);
        let k = neighbor_key('A', &mut rng);
        assert!(['q', 'w', 's', 'z'].contains(&k));
    }
}
