//! The 256-entry phonetic verification word list (spec component C5):
//! four indices into this list are read aloud by the two parties on a
//! challenge/response exchange to detect a replayed or substituted
//! message out-of-band.
//!
//! The specification requires a fixed, byte-identical list across
//! conforming implementations but leaves its exact contents exogenous.
//! This crate generates its 256 entries deterministically from two
//! 16-entry syllable tables (`ONSETS × CODAS`), which guarantees
//! uniqueness structurally rather than by hand-transcribing 256 words -
//! see `DESIGN.md` for why this resolution was chosen over vendoring an
//! existing external list.

use std::sync::LazyLock;

const ONSETS: [&str; 16] = [
    "ba", "ca", "da", "fe", "ga", "ha", "ji", "ka", "la", "mo", "na", "pe", "ra", "si", "ta", "vu",
];

const CODAS: [&str; 16] = [
    "bin", "dex", "fil", "gor", "hix", "jet", "kol", "lum", "mon", "nix", "pol", "quin", "rex",
    "sol", "tor", "vex",
];

/// The fixed 256-word list, indexed `0..=255`.
pub static VERIFICATION_WORDS: LazyLock<[String; 256]> =
    LazyLock::new(|| std::array::from_fn(|i| format!("{}{}", ONSETS[i / 16], CODAS[i % 16])));

/// Look up a single verification word by index.
pub fn word(index: u8) -> &'static str {
    &VERIFICATION_WORDS[index as usize]
}

/// Resolve four indices at once, the shape a challenge's `WORDS` tag
/// carries.
pub fn words(indices: [u8; 4]) -> [&'static str; 4] {
    std::array::from_fn(|i| word(indices[i]))
}
