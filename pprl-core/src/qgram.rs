//! Q-gram expansion of a normalized field value.
//!
//! Each field is padded with `q - 1` underscores on both sides so that
//! leading and trailing characters get the same positional weight as
//! interior ones, then every length-`q` substring is taken. Values shorter
//! than `q` (after padding they'd still be shorter than `q`) are emitted
//! whole, unpadded.

use std::collections::BTreeSet;

/// Splits `value` into its set of q-grams. Deduplicated: a q-gram that
/// repeats within the value only contributes one set member.
pub fn qgrams(value: &str, q: usize) -> BTreeSet<String> {
    assert!(q > 0, "q must be positive");
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < q {
        let mut set = BTreeSet::new();
        if !value.is_empty() {
            set.insert(value.to_owned());
        }
        return set;
    }

    let pad: String = std::iter::repeat('_').take(q - 1).collect();
    let padded: Vec<char> = pad
        .chars()
        .chain(chars.iter().copied())
        .chain(pad.chars())
        .collect();

    let mut set = BTreeSet::new();
    for window in padded.windows(q) {
        set.insert(window.iter().collect());
    }
    set
}

/// Expands every field in `fields` into one combined q-gram set, each
/// member tagged with its source field index to avoid cross-field
/// collisions (`"name:jo"` rather than bare `"jo"`).
pub fn qgrams_for_fields(fields: &[(usize, &str)], q: usize) -> BTreeSet<String> {
    let mut combined = BTreeSet::new();
    for &(field_idx, value) in fields {
        for gram in qgrams(value, q) {
            combined.insert(format!("{field_idx}:{gram}"));
        }
    }
    combined
}
