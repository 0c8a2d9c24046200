//! Music theory primitives and analysis: pitches, intervals, scales,
//! chords, keys, roman-numeral progressions, and voice leading.
//!
//! Everything here is a pure function over value types. Invalid input
//! (unknown scale/chord types, out-of-range MIDI numbers, mismatched
//! lengths) errors immediately; analysis uncertainty is a confidence
//! score, never an error; unrecognized chord-symbol suffixes degrade to
//! a major triad rather than failing.
//!
//! # Example
//!
//! ```
//! use music_theory::chord::Voicing;
//! use music_theory::progression::create_progression;
//!
//! let progression = create_progression("C", &["I", "vi", "ii", "V"], 1.0, Voicing::Close);
//! let roots: Vec<&str> = progression
//!     .chords
//!     .iter()
//!     .map(|c| c.root.name.as_str())
//!     .collect();
//! assert_eq!(roots, vec!["C", "A", "D", "G"]);
//! ```

pub mod backend;
pub mod chord;
pub mod error;
pub mod key;
pub mod note;
pub mod progression;
pub mod scale;
pub mod voice_leading;

pub use backend::{default_backend, BuiltinBackend, TheoryBackend};
pub use chord::{build_chord, Chord, ChordType, Voicing};
pub use error::TheoryError;
pub use key::{detect_key, parse_key, KeyAnalysis, KeyMode};
pub use note::{Interval, IntervalQuality, Note};
pub use progression::{create_progression, ChordProgression};
pub use scale::{generate_scale, Scale};
pub use voice_leading::{
    four_part_harmony, optimize_voice_leading, validate_voice_leading, VoiceLeadingAnalysis,
};
