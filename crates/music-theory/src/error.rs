use thiserror::Error;

/// Invalid-input errors surfaced to callers.
///
/// Degraded conditions (unknown chord-symbol suffix, missing genre data,
/// low-confidence analysis) are never errors — they fall back or report
/// a confidence score instead.
#[derive(Debug, Error)]
pub enum TheoryError {
    #[error("MIDI note {0} out of range 0-127")]
    MidiOutOfRange(u16),

    #[error("unknown scale type: {0}")]
    UnknownScaleType(String),

    #[error("unknown chord type: {0}")]
    UnknownChordType(String),

    #[error("unrecognized key name: {0}")]
    UnknownKey(String),

    #[error("mode degree {degree} out of range 1-{max}")]
    DegreeOutOfRange { degree: usize, max: usize },

    #[error("need at least {needed} notes for analysis, got {got}")]
    InsufficientNotes { needed: usize, got: usize },

    #[error("melody length {melody} does not match progression length {progression}")]
    LengthMismatch { melody: usize, progression: usize },
}
