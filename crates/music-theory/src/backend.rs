use std::sync::{Arc, OnceLock};

use crate::chord::{analyze_chord, ChordMatch};
use crate::error::TheoryError;
use crate::key::{detect_key, KeyAnalysis};
use crate::note::{interval_between, Interval, Note};
use crate::scale::{generate_scale, Scale};

/// Pluggable theory backend.
///
/// The built-in implementation covers everything; an external library or
/// learned model can be substituted at construction time. Callers that
/// hold a backend degrade to the built-in tables simply by constructing
/// `BuiltinBackend`, so no call path can fail from a missing integration.
pub trait TheoryBackend: Send + Sync {
    fn scale(&self, root: &str, scale_type: &str, octave: i8) -> Result<Scale, TheoryError>;

    fn match_chord(&self, midi_notes: &[u8]) -> Result<Vec<ChordMatch>, TheoryError>;

    fn detect_key(&self, midi_notes: &[u8], timestamps: Option<&[f64]>) -> KeyAnalysis;

    fn interval(&self, a: &Note, b: &Note) -> Interval;
}

/// Backend backed by the crate's own tables and algorithms.
pub struct BuiltinBackend;

impl TheoryBackend for BuiltinBackend {
    fn scale(&self, root: &str, scale_type: &str, octave: i8) -> Result<Scale, TheoryError> {
        generate_scale(root, scale_type, octave)
    }

    fn match_chord(&self, midi_notes: &[u8]) -> Result<Vec<ChordMatch>, TheoryError> {
        analyze_chord(midi_notes)
    }

    fn detect_key(&self, midi_notes: &[u8], timestamps: Option<&[f64]>) -> KeyAnalysis {
        detect_key(midi_notes, timestamps)
    }

    fn interval(&self, a: &Note, b: &Note) -> Interval {
        interval_between(a, b)
    }
}

/// Process-wide default backend for callers that don't inject their own.
/// Lazily initialized once; prefer construction-time injection in library
/// code so tests can substitute a fake.
pub fn default_backend() -> Arc<dyn TheoryBackend> {
    static DEFAULT: OnceLock<Arc<dyn TheoryBackend>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(BuiltinBackend)).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_backend_answers() {
        let backend = BuiltinBackend;
        let scale = backend.scale("C", "major", 4).unwrap();
        assert_eq!(scale.notes.len(), 7);

        let matches = backend.match_chord(&[60, 64, 67]).unwrap();
        assert_eq!(matches[0].symbol, "C");

        let key = backend.detect_key(&[60, 62, 64, 65, 67, 69, 71], None);
        assert_eq!(key.most_likely_key, "C");
    }

    #[test]
    fn default_backend_is_shared() {
        let a = default_backend();
        let b = default_backend();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
