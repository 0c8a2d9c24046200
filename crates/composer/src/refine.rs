//! Single-pass refinement: one fixed transformation per requested focus
//! area, applied to an independent copy of the composition. The input is
//! never mutated.

use serde::{Deserialize, Serialize};
use tracing::debug;

use music_theory::chord::{build_chord, Voicing};
use music_theory::note::note_name;

use crate::quality::analyze_quality;
use crate::types::{CompleteComposition, DynamicLevel, NoteSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    Melody,
    Harmony,
    Rhythm,
    Arrangement,
}

impl FocusArea {
    pub fn from_name(name: &str) -> Option<FocusArea> {
        match name.to_ascii_lowercase().as_str() {
            "melody" => Some(FocusArea::Melody),
            "harmony" => Some(FocusArea::Harmony),
            "rhythm" => Some(FocusArea::Rhythm),
            "arrangement" => Some(FocusArea::Arrangement),
            _ => None,
        }
    }
}

/// Insert a passing tone inside every leap larger than a fourth, then
/// widen the register by lifting every fourth note an octave if the whole
/// line spans less than an octave.
fn refine_melody(c: &mut CompleteComposition) {
    let melody = &mut c.melody;
    let mut notes = Vec::with_capacity(melody.notes.len() * 2);
    let mut rhythm = Vec::with_capacity(melody.rhythm.len() * 2);
    let mut sources = Vec::with_capacity(melody.sources.len() * 2);

    for i in 0..melody.notes.len() {
        let duration = melody.rhythm[i];
        let leap_next = melody
            .notes
            .get(i + 1)
            .map(|&next| (next as i16 - melody.notes[i] as i16).abs() > 4)
            .unwrap_or(false);

        if leap_next {
            let next = melody.notes[i + 1];
            let passing = ((melody.notes[i] as i16 + next as i16) / 2) as u8;
            notes.push(melody.notes[i]);
            rhythm.push(duration / 2.0);
            sources.push(melody.sources[i]);
            notes.push(passing);
            rhythm.push(duration / 2.0);
            sources.push(NoteSource::Chromatic);
        } else {
            notes.push(melody.notes[i]);
            rhythm.push(duration);
            sources.push(melody.sources[i]);
        }
    }

    let max = notes.iter().copied().max().unwrap_or(0) as i16;
    let min = notes.iter().copied().min().unwrap_or(0) as i16;
    if max - min < 12 {
        debug!("melody spans less than an octave, widening");
        for (i, note) in notes.iter_mut().enumerate() {
            if i % 4 == 3 && *note <= 115 {
                *note += 12;
            }
        }
    }

    melody.notes = notes;
    melody.rhythm = rhythm;
    melody.sources = sources;
}

/// Insert a diminished passing chord a semitone below each root that sits
/// three or more semitones from its predecessor, stealing one beat from
/// the preceding chord.
fn refine_harmony(c: &mut CompleteComposition) {
    let harmony = &mut c.harmony;
    let use_flats = harmony.key.contains('b');
    let mut i = 0;
    while i + 1 < harmony.chords.len() {
        let from = harmony.chords[i].root.pitch_class() as i16;
        let to = harmony.chords[i + 1].root.pitch_class() as i16;
        let gap = (to - from).rem_euclid(12).min((from - to).rem_euclid(12));
        if gap >= 3 && harmony.durations[i] > 1.0 {
            let passing_pc = (to - 1).rem_euclid(12) as u8;
            let root = note_name(passing_pc, use_flats);
            if let Ok(passing) = build_chord(root, "dim", 0, Voicing::Close, 4) {
                let numeral = passing.symbol.clone();
                harmony.durations[i] -= 1.0;
                harmony.chords.insert(i + 1, passing);
                harmony.roman_numerals.insert(i + 1, numeral);
                harmony.durations.insert(i + 1, 1.0);
                i += 1;
            }
        }
        i += 1;
    }
}

/// Alternate long-short: stretch even-indexed durations, compress odd.
fn refine_rhythm(c: &mut CompleteComposition) {
    for (i, duration) in c.melody.rhythm.iter_mut().enumerate() {
        if i % 2 == 0 {
            *duration *= 1.5;
        } else {
            *duration *= 0.5;
        }
    }
}

/// Replace flat dynamics with a ramp toward the part's final third.
fn refine_arrangement(c: &mut CompleteComposition) {
    for part in c.arrangement.parts.values_mut() {
        let n = part.dynamics.len();
        if n == 0 {
            continue;
        }
        for (i, dynamic) in part.dynamics.iter_mut().enumerate() {
            *dynamic = if i < n / 3 {
                DynamicLevel::Mp
            } else if i < 2 * n / 3 {
                DynamicLevel::Mf
            } else {
                DynamicLevel::F
            };
        }
    }
}

/// Apply one fixed transformation per focus area to a copy of the
/// composition and rescore it. The original is left untouched; repeated
/// refinement requires repeated calls.
pub fn refine(composition: &CompleteComposition, focus: &[FocusArea]) -> CompleteComposition {
    let mut refined = composition.clone();
    for &area in focus {
        debug!(?area, "refining");
        match area {
            FocusArea::Melody => refine_melody(&mut refined),
            FocusArea::Harmony => refine_harmony(&mut refined),
            FocusArea::Rhythm => refine_rhythm(&mut refined),
            FocusArea::Arrangement => refine_arrangement(&mut refined),
        }
    }
    refined.quality = analyze_quality(&refined);
    refined
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use music_theory::chord::Voicing;
    use music_theory::progression::create_progression;

    use crate::quality::analyze_quality;
    use crate::types::{
        Arrangement, CompleteComposition, Melody, Register, Section, SectionType, SongStructure,
    };

    use super::*;

    fn composition() -> CompleteComposition {
        let harmony = create_progression("C", &["I", "IV", "V", "I"], 4.0, Voicing::Close);
        let melody = Melody {
            notes: vec![72, 79, 72, 74, 76, 77],
            rhythm: vec![1.0; 6],
            register: Register::Mid,
            sources: vec![NoteSource::ChordTone; 6],
        };
        let structure = SongStructure {
            genre: "pop".into(),
            sections: vec![Section {
                section_type: SectionType::Verse,
                key: "C".into(),
                duration: 120.0,
                measures: 60,
                energy: 0.5,
                texture: None,
            }],
            key_plan: vec!["C".into()],
            tempo: 120,
            time_signature: (4, 4),
            total_duration: 120.0,
        };
        let mut c = CompleteComposition {
            title: "Draft".into(),
            genre: "pop".into(),
            key: "C".into(),
            tempo: 120,
            time_signature: (4, 4),
            structure,
            melody,
            harmony,
            arrangement: Arrangement {
                ensemble: "piano_solo".into(),
                style: "pop".into(),
                parts: BTreeMap::new(),
                mix_balance: BTreeMap::new(),
            },
            quality: crate::types::QualityReport {
                melody: 0.0,
                harmony: 0.0,
                rhythm: 0.0,
                form: 0.0,
                arrangement: 0.0,
                overall: 0.0,
                issues: vec![],
                suggestions: vec![],
            },
        };
        c.quality = analyze_quality(&c);
        c
    }

    #[test]
    fn refine_never_mutates_the_original() {
        let original = composition();
        let snapshot = original.clone();
        let _ = refine(
            &original,
            &[
                FocusArea::Melody,
                FocusArea::Harmony,
                FocusArea::Rhythm,
                FocusArea::Arrangement,
            ],
        );
        assert_eq!(original, snapshot);
    }

    #[test]
    fn melody_focus_fills_leaps_with_passing_tones() {
        let refined = refine(&composition(), &[FocusArea::Melody]);
        // 72 -> 79 is a leap; a midpoint appears between them.
        let pos = refined
            .melody
            .notes
            .iter()
            .position(|&n| n == 72)
            .unwrap();
        assert_eq!(refined.melody.notes[pos + 1], 75);
        assert_eq!(refined.melody.notes.len(), refined.melody.rhythm.len());
        assert_eq!(refined.melody.notes.len(), refined.melody.sources.len());
    }

    #[test]
    fn harmony_focus_inserts_passing_chords() {
        let before = composition();
        let refined = refine(&before, &[FocusArea::Harmony]);
        assert!(refined.harmony.len() > before.harmony.len());
        assert_eq!(
            refined.harmony.chords.len(),
            refined.harmony.roman_numerals.len()
        );
        assert_eq!(refined.harmony.chords.len(), refined.harmony.durations.len());
        // Total beats are preserved: passing chords steal time.
        assert!((refined.harmony.total_duration() - before.harmony.total_duration()).abs() < 1e-9);
    }

    #[test]
    fn rhythm_focus_alternates_long_and_short() {
        let refined = refine(&composition(), &[FocusArea::Rhythm]);
        assert_eq!(refined.melody.rhythm[0], 1.5);
        assert_eq!(refined.melody.rhythm[1], 0.5);
    }

    #[test]
    fn refinement_rescores_the_result() {
        let before = composition();
        let refined = refine(&before, &[FocusArea::Rhythm]);
        // Uniform rhythm issue disappears after syncopation.
        assert!(before.quality.issues.iter().any(|i| i.contains("uniform")));
        assert!(!refined.quality.issues.iter().any(|i| i.contains("uniform")));
    }
}
