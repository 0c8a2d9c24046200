use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TheoryError;
use crate::note::{note_name, pitch_class_of, Note, FLAT_KEY_ROOTS};

/// A scale interval pattern: semitone steps summing to one octave.
struct ScalePattern {
    name: &'static str,
    steps: &'static [u8],
}

/// Supported scale types. Steps always sum to 12.
static SCALE_PATTERNS: &[ScalePattern] = &[
    ScalePattern { name: "major", steps: &[2, 2, 1, 2, 2, 2, 1] },
    ScalePattern { name: "natural_minor", steps: &[2, 1, 2, 2, 1, 2, 2] },
    ScalePattern { name: "minor", steps: &[2, 1, 2, 2, 1, 2, 2] },
    ScalePattern { name: "harmonic_minor", steps: &[2, 1, 2, 2, 1, 3, 1] },
    ScalePattern { name: "melodic_minor", steps: &[2, 1, 2, 2, 2, 2, 1] },
    ScalePattern { name: "dorian", steps: &[2, 1, 2, 2, 2, 1, 2] },
    ScalePattern { name: "phrygian", steps: &[1, 2, 2, 2, 1, 2, 2] },
    ScalePattern { name: "lydian", steps: &[2, 2, 2, 1, 2, 2, 1] },
    ScalePattern { name: "mixolydian", steps: &[2, 2, 1, 2, 2, 1, 2] },
    ScalePattern { name: "locrian", steps: &[1, 2, 2, 1, 2, 2, 2] },
    ScalePattern { name: "major_pentatonic", steps: &[2, 2, 3, 2, 3] },
    ScalePattern { name: "minor_pentatonic", steps: &[3, 2, 2, 3, 2] },
    ScalePattern { name: "blues", steps: &[3, 2, 1, 1, 3, 2] },
    ScalePattern { name: "whole_tone", steps: &[2, 2, 2, 2, 2, 2] },
    ScalePattern { name: "chromatic", steps: &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1] },
    ScalePattern { name: "diminished_wh", steps: &[2, 1, 2, 1, 2, 1, 2, 1] },
    ScalePattern { name: "diminished_hw", steps: &[1, 2, 1, 2, 1, 2, 1, 2] },
    ScalePattern { name: "bebop_dominant", steps: &[2, 2, 1, 2, 2, 1, 1, 1] },
    ScalePattern { name: "bebop_major", steps: &[2, 2, 1, 2, 1, 1, 2, 1] },
    ScalePattern { name: "altered", steps: &[1, 2, 1, 2, 2, 2, 2] },
    ScalePattern { name: "lydian_dominant", steps: &[2, 2, 2, 1, 2, 1, 2] },
    ScalePattern { name: "phrygian_dominant", steps: &[1, 3, 1, 2, 1, 2, 2] },
    ScalePattern { name: "hungarian_minor", steps: &[2, 1, 3, 1, 1, 3, 1] },
    ScalePattern { name: "harmonic_major", steps: &[2, 2, 1, 2, 1, 3, 1] },
    ScalePattern { name: "hirajoshi", steps: &[2, 1, 4, 1, 4] },
    ScalePattern { name: "in_sen", steps: &[1, 4, 2, 3, 2] },
];

/// Look up a scale pattern's steps by name.
pub fn scale_pattern(scale_type: &str) -> Option<&'static [u8]> {
    SCALE_PATTERNS
        .iter()
        .find(|p| p.name == scale_type)
        .map(|p| p.steps)
}

/// Names of every supported scale type (aliases deduplicated).
pub fn scale_type_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = SCALE_PATTERNS.iter().map(|p| p.name).collect();
    names.dedup();
    names
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub root: Note,
    /// "C major", "A natural_minor", ...
    pub name: String,
    /// Semitone steps between consecutive degrees, summing to 12.
    pub pattern: Vec<u8>,
    /// One octave of notes, ascending, starting at the root.
    pub notes: Vec<Note>,
}

impl Scale {
    pub fn pitch_classes(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.pitch_class()).collect()
    }
}

/// Build a scale from a root name and scale type.
///
/// Walks the interval pattern upward from the root, stopping before the
/// octave repeat, so the note count equals the pattern length.
pub fn generate_scale(root: &str, scale_type: &str, octave: i8) -> Result<Scale, TheoryError> {
    let steps = scale_pattern(scale_type)
        .ok_or_else(|| TheoryError::UnknownScaleType(scale_type.to_string()))?;
    let root_pc = pitch_class_of(root).ok_or_else(|| TheoryError::UnknownKey(root.to_string()))?;
    let use_flats = root.contains('b') || FLAT_KEY_ROOTS.contains(&root_pc);

    let root_midi = (octave as i32 + 1) * 12 + root_pc as i32;
    if !(0..=127).contains(&root_midi) {
        return Err(TheoryError::MidiOutOfRange(root_midi.max(0) as u16));
    }

    let mut notes = Vec::with_capacity(steps.len());
    let mut midi = root_midi;
    for (i, &step) in steps.iter().enumerate() {
        notes.push(Note::from_midi(midi as u16, use_flats)?);
        if i + 1 < steps.len() {
            midi += step as i32;
        }
    }

    Ok(Scale {
        root: notes[0].clone(),
        name: format!("{} {}", notes[0].name, scale_type),
        pattern: steps.to_vec(),
        notes,
    })
}

/// Rotate a scale to one of its modes.
///
/// Degree 1 is the scale itself; degree `pattern.len()` starts on the
/// final scale tone.
pub fn get_mode(scale: &Scale, degree: usize) -> Result<Scale, TheoryError> {
    let len = scale.pattern.len();
    if degree < 1 || degree > len {
        return Err(TheoryError::DegreeOutOfRange { degree, max: len });
    }
    let shift = degree - 1;

    let mut pattern: Vec<u8> = scale.pattern[shift..].to_vec();
    pattern.extend_from_slice(&scale.pattern[..shift]);

    // Rebuild notes from the new root, keeping pitches in ascending order
    // by lifting the wrapped-around notes up an octave.
    let mut notes: Vec<Note> = Vec::with_capacity(len);
    let use_flats = scale.root.name.contains('b');
    for (i, note) in scale.notes.iter().cycle().skip(shift).take(len).enumerate() {
        let midi = if i < len - shift {
            note.midi as u16
        } else {
            note.midi as u16 + 12
        };
        notes.push(Note::from_midi(midi, use_flats)?);
    }

    Ok(Scale {
        root: notes[0].clone(),
        name: format!("mode {} of {}", degree, scale.name),
        pattern,
        notes,
    })
}

/// One candidate from scale analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleMatch {
    pub root: String,
    pub scale_type: String,
    /// 0-1, normalized match score.
    pub confidence: f64,
    pub matched: usize,
    pub missing: usize,
    pub extra: usize,
}

/// Detect which scales a set of MIDI notes most plausibly belongs to.
///
/// Extracts unique pitch classes and scores every (root, scale type)
/// candidate by `2*common - missing - 0.5*extra`, normalized to 0-1.
/// Requires at least 5 distinct pitch classes for a reliable answer.
/// Returns up to 5 candidates above 0.6 confidence, best first.
pub fn analyze_scale(midi_notes: &[u8]) -> Result<Vec<ScaleMatch>, TheoryError> {
    let mut pcs: Vec<u8> = midi_notes.iter().map(|n| n % 12).collect();
    pcs.sort_unstable();
    pcs.dedup();

    if pcs.len() < 5 {
        return Err(TheoryError::InsufficientNotes {
            needed: 5,
            got: pcs.len(),
        });
    }

    let mut matches = Vec::new();
    for root in 0..12u8 {
        for pattern in SCALE_PATTERNS {
            // Skip the duplicate alias so results list one name per pattern
            if pattern.name == "minor" {
                continue;
            }
            let scale_pcs = pattern_pitch_classes(root, pattern.steps);

            let common = pcs.iter().filter(|pc| scale_pcs.contains(pc)).count();
            let extra = pcs.len() - common;
            let missing = scale_pcs.len() - common;

            let score = 2.0 * common as f64 - missing as f64 - 0.5 * extra as f64;
            let confidence = (score / (2.0 * scale_pcs.len() as f64)).clamp(0.0, 1.0);

            if confidence > 0.6 {
                let use_flats = FLAT_KEY_ROOTS.contains(&root);
                matches.push(ScaleMatch {
                    root: note_name(root, use_flats).to_string(),
                    scale_type: pattern.name.to_string(),
                    confidence,
                    matched: common,
                    missing,
                    extra,
                });
            }
        }
    }

    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches.truncate(5);
    debug!(candidates = matches.len(), "scale analysis complete");
    Ok(matches)
}

fn pattern_pitch_classes(root: u8, steps: &[u8]) -> Vec<u8> {
    let mut pcs = Vec::with_capacity(steps.len());
    let mut pc = root;
    for (i, &step) in steps.iter().enumerate() {
        pcs.push(pc % 12);
        if i + 1 < steps.len() {
            pc = (pc + step) % 12;
        }
    }
    pcs
}

/// Transpose a note set between keys by the semitone delta of their roots.
///
/// Mode is ignored; only the key roots matter. The delta is wrapped to the
/// nearest direction (-5..=6). Results are NOT clamped to the MIDI range —
/// out-of-range values stay visible to the caller, which owns the decision
/// of folding or rejecting them.
pub fn transpose_to_key(
    notes: &[u8],
    from_key: &str,
    to_key: &str,
) -> Result<Vec<i32>, TheoryError> {
    let from = pitch_class_of(from_key)
        .ok_or_else(|| TheoryError::UnknownKey(from_key.to_string()))?;
    let to =
        pitch_class_of(to_key).ok_or_else(|| TheoryError::UnknownKey(to_key.to_string()))?;

    let mut delta = to as i32 - from as i32;
    if delta > 6 {
        delta -= 12;
    } else if delta < -5 {
        delta += 12;
    }

    Ok(notes.iter().map(|&n| n as i32 + delta).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn c_major_note_names() {
        let scale = generate_scale("C", "major", 4).unwrap();
        let names: Vec<&str> = scale.notes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["C", "D", "E", "F", "G", "A", "B"]);
        assert_eq!(scale.root.midi, 60);
        assert_eq!(scale.notes.len(), scale.pattern.len());
    }

    #[test]
    fn every_pattern_sums_to_octave() {
        for pattern in SCALE_PATTERNS {
            let sum: u8 = pattern.steps.iter().sum();
            assert_eq!(sum, 12, "{} must span one octave", pattern.name);
        }
    }

    #[test]
    fn every_scale_starts_on_root() {
        for pattern in SCALE_PATTERNS {
            for root in 0..12u8 {
                let name = note_name(root, false);
                let scale = generate_scale(name, pattern.name, 3).unwrap();
                assert_eq!(scale.notes.len(), pattern.steps.len());
                assert_eq!(scale.root.pitch_class(), root);
                assert_eq!(scale.notes[0], scale.root);
            }
        }
    }

    #[test]
    fn unknown_scale_type_rejected() {
        let err = generate_scale("C", "klingon", 4).unwrap_err();
        assert!(matches!(err, TheoryError::UnknownScaleType(_)));
    }

    #[test]
    fn dorian_is_second_mode_of_major() {
        let c_major = generate_scale("C", "major", 4).unwrap();
        let d_dorian = get_mode(&c_major, 2).unwrap();
        assert_eq!(d_dorian.pattern, scale_pattern("dorian").unwrap().to_vec());
        assert_eq!(d_dorian.root.name, "D");
        // Still ascending after rotation
        for pair in d_dorian.notes.windows(2) {
            assert!(pair[0].midi < pair[1].midi);
        }
    }

    #[test]
    fn mode_degree_bounds() {
        let scale = generate_scale("C", "major", 4).unwrap();
        assert!(get_mode(&scale, 0).is_err());
        assert!(get_mode(&scale, 8).is_err());
        assert!(get_mode(&scale, 7).is_ok());
    }

    #[test]
    fn c_major_notes_analyzed() {
        let matches = analyze_scale(&[60, 62, 64, 65, 67, 69, 71]).unwrap();
        let top = &matches[0];
        assert_eq!(top.root, "C");
        assert_eq!(top.scale_type, "major");
        assert!(top.confidence > 0.9, "confidence {}", top.confidence);
    }

    #[test]
    fn too_few_pitch_classes_rejected() {
        let err = analyze_scale(&[60, 64, 67, 72, 76]).unwrap_err();
        assert!(matches!(err, TheoryError::InsufficientNotes { got: 3, .. }));
    }

    #[test]
    fn transpose_roundtrip() {
        let notes = [60, 64, 67];
        let up = transpose_to_key(&notes, "C", "E").unwrap();
        assert_eq!(up, vec![64, 68, 71]);
        let back: Vec<u8> = transpose_to_key(
            &up.iter().map(|&n| n as u8).collect::<Vec<_>>(),
            "E",
            "C",
        )
        .unwrap()
        .iter()
        .map(|&n| n as u8)
        .collect();
        assert_eq!(back.to_vec(), notes.to_vec());
    }

    #[test]
    fn transpose_takes_nearest_direction() {
        // C to G is a fourth down, not a fifth up
        let moved = transpose_to_key(&[60], "C", "G").unwrap();
        assert_eq!(moved, vec![55]);
    }
}
