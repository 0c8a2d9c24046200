//! Motif development and phrase construction. Transformations are the
//! classical ones: sequence, inversion, retrograde, augmentation,
//! diminution, fragmentation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use music_theory::error::TheoryError;
use music_theory::key::{parse_key, KeyMode};
use music_theory::note::{note_name, FLAT_KEY_ROOTS};
use music_theory::progression::ChordProgression;
use music_theory::scale::generate_scale;

use crate::types::{Melody, Motif, NoteSource, Register};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    Sequence,
    Inversion,
    Retrograde,
    Augmentation,
    Diminution,
    Fragmentation,
}

impl Technique {
    pub fn from_name(name: &str) -> Option<Technique> {
        match name.to_ascii_lowercase().as_str() {
            "sequence" => Some(Technique::Sequence),
            "inversion" => Some(Technique::Inversion),
            "retrograde" => Some(Technique::Retrograde),
            "augmentation" => Some(Technique::Augmentation),
            "diminution" => Some(Technique::Diminution),
            "fragmentation" => Some(Technique::Fragmentation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifDevelopment {
    pub notes: Vec<u8>,
    /// Beats, parallel to `notes`.
    pub rhythm: Vec<f64>,
    pub techniques: Vec<Technique>,
    /// Fraction of the motif's consecutive intervals still present
    /// anywhere in the developed line.
    pub interval_preservation: f64,
}

fn intervals_of(notes: &[u8]) -> Vec<i16> {
    notes.windows(2).map(|w| w[1] as i16 - w[0] as i16).collect()
}

/// Develop a motif by applying `techniques` in order to the running
/// result. Sequence appends the motif transposed up 2 semitones;
/// inversion mirrors the line around its first note; retrograde reverses
/// it; augmentation and diminution scale the rhythm by 2 and 0.5;
/// fragmentation keeps the first half, stated twice.
///
/// The result is then padded at the front by alternating the motif's
/// first two notes until it spans `target_measures` at four notes per
/// measure, so the developed material keeps its ending intact.
pub fn develop_motif(
    motif: &Motif,
    techniques: &[Technique],
    target_measures: u32,
) -> MotifDevelopment {
    let mut notes = motif.notes.clone();
    let mut rhythm = motif.rhythm.clone();

    for &technique in techniques {
        match technique {
            Technique::Sequence => {
                notes.extend(
                    motif
                        .notes
                        .iter()
                        .map(|&n| (n as i16 + 2).clamp(0, 127) as u8),
                );
                rhythm.extend(&motif.rhythm);
            }
            Technique::Inversion => {
                if let Some(&first) = notes.first() {
                    let axis = first as i16;
                    for n in notes.iter_mut() {
                        *n = (axis - (*n as i16 - axis)).clamp(0, 127) as u8;
                    }
                }
            }
            Technique::Retrograde => {
                notes.reverse();
                rhythm.reverse();
            }
            Technique::Augmentation => {
                for d in rhythm.iter_mut() {
                    *d *= 2.0;
                }
            }
            Technique::Diminution => {
                for d in rhythm.iter_mut() {
                    *d *= 0.5;
                }
            }
            Technique::Fragmentation => {
                let half = notes.len().div_ceil(2);
                let fragment: Vec<u8> = notes[..half].to_vec();
                let fragment_rhythm: Vec<f64> = rhythm[..half].to_vec();
                notes = fragment.clone();
                notes.extend(fragment);
                rhythm = fragment_rhythm.clone();
                rhythm.extend(fragment_rhythm);
            }
        }
    }

    let target = target_measures as usize * 4;
    if notes.len() < target && motif.notes.len() >= 2 {
        let needed = target - notes.len();
        let mut pad_notes = Vec::with_capacity(needed);
        let mut pad_rhythm = Vec::with_capacity(needed);
        for i in 0..needed {
            pad_notes.push(motif.notes[i % 2]);
            pad_rhythm.push(motif.rhythm[i % 2]);
        }
        pad_notes.extend(notes);
        pad_rhythm.extend(rhythm);
        notes = pad_notes;
        rhythm = pad_rhythm;
    }

    let original = intervals_of(&motif.notes);
    let developed = intervals_of(&notes);
    let interval_preservation = if original.is_empty() {
        1.0
    } else {
        let kept = original
            .iter()
            .filter(|iv| developed.contains(iv))
            .count();
        kept as f64 / original.len() as f64
    };

    MotifDevelopment {
        notes,
        rhythm,
        techniques: techniques.to_vec(),
        interval_preservation,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseType {
    Period,
    Sentence,
}

impl PhraseType {
    pub fn from_name(name: &str) -> PhraseType {
        match name.to_ascii_lowercase().as_str() {
            "sentence" => PhraseType::Sentence,
            _ => PhraseType::Period,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseStyle {
    Vocal,
    Instrumental,
}

/// Index spans (start, end-exclusive) into the phrase melody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "form")]
pub enum PhraseForm {
    Period {
        antecedent: (usize, usize),
        consequent: (usize, usize),
    },
    Sentence {
        presentation: (usize, usize),
        repetition: (usize, usize),
        continuation: (usize, usize),
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadencePlan {
    /// Note index the cadence lands on (end-exclusive).
    pub position: usize,
    /// "half", "authentic".
    pub cadence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub melody: Melody,
    pub form: PhraseForm,
    pub cadences: Vec<CadencePlan>,
}

/// Generate a phrase over a progression: two notes per chord in vocal
/// style, four in instrumental, drawn from chord tones (60%) or the first
/// three scale tones (40%). Vocal lines get leaps beyond a fifth replaced
/// by a step in the same direction.
pub fn create_phrase(
    progression: &ChordProgression,
    key: &str,
    phrase_type: PhraseType,
    style: PhraseStyle,
    rng: &mut impl Rng,
) -> Result<Phrase, TheoryError> {
    let (key_pc, mode) = parse_key(key)?;
    let root_name = note_name(key_pc, FLAT_KEY_ROOTS.contains(&key_pc));
    let scale_type = match mode {
        KeyMode::Major => "major",
        KeyMode::Minor => "natural_minor",
    };
    let scale = generate_scale(root_name, scale_type, 4)?;
    let head_pcs: Vec<u8> = scale.pitch_classes().into_iter().take(3).collect();

    let notes_per_chord = match style {
        PhraseStyle::Vocal => 2usize,
        PhraseStyle::Instrumental => 4usize,
    };

    let mut notes = Vec::new();
    let mut rhythm = Vec::new();
    let mut sources = Vec::new();
    let mut prev: u8 = 72;

    for (chord, &duration) in progression.chords.iter().zip(&progression.durations) {
        let chord_pcs = chord.pitch_classes();
        for _ in 0..notes_per_chord {
            let (pc, source) = if rng.random_bool(0.6) {
                (
                    chord_pcs[rng.random_range(0..chord_pcs.len())],
                    NoteSource::ChordTone,
                )
            } else {
                (
                    head_pcs[rng.random_range(0..head_pcs.len())],
                    NoteSource::ScaleTone,
                )
            };
            let base = prev as i16 - (prev as i16).rem_euclid(12) + pc as i16;
            let note = [base - 12, base, base + 12]
                .into_iter()
                .min_by_key(|c| (c - prev as i16).abs())
                .unwrap_or(base)
                .clamp(55, 88) as u8;
            notes.push(note);
            rhythm.push(duration / notes_per_chord as f64);
            sources.push(source);
            prev = note;
        }
    }

    if style == PhraseStyle::Vocal {
        for i in 1..notes.len() {
            let diff = notes[i] as i16 - notes[i - 1] as i16;
            if diff.abs() > 7 {
                notes[i] = (notes[i - 1] as i16 + 2 * diff.signum()).clamp(0, 127) as u8;
            }
        }
    }

    let n = notes.len();
    let (form, cadences) = match phrase_type {
        PhraseType::Period => (
            PhraseForm::Period {
                antecedent: (0, n / 2),
                consequent: (n / 2, n),
            },
            vec![
                CadencePlan {
                    position: n / 2,
                    cadence: "half".into(),
                },
                CadencePlan {
                    position: n,
                    cadence: "authentic".into(),
                },
            ],
        ),
        PhraseType::Sentence => (
            PhraseForm::Sentence {
                presentation: (0, n / 4),
                repetition: (n / 4, n / 2),
                continuation: (n / 2, n),
            },
            vec![CadencePlan {
                position: n,
                cadence: "authentic".into(),
            }],
        ),
    };

    Ok(Phrase {
        melody: Melody {
            notes,
            rhythm,
            register: Register::Mid,
            sources,
        },
        form,
        cadences,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use music_theory::chord::Voicing;
    use music_theory::progression::create_progression;

    use super::*;

    #[test]
    fn retrograde_keeps_the_reversed_motif_at_the_tail() {
        let motif = Motif::new(vec![60, 62, 64]);
        let developed = develop_motif(&motif, &[Technique::Retrograde], 2);
        assert_eq!(developed.notes.len(), 8);
        assert_eq!(&developed.notes[5..], &[64, 62, 60]);
    }

    #[test]
    fn sequence_appends_a_transposed_statement() {
        let motif = Motif::new(vec![60, 62, 64]);
        let developed = develop_motif(&motif, &[Technique::Sequence], 0);
        assert_eq!(developed.notes, vec![60, 62, 64, 62, 64, 66]);
        assert_eq!(developed.interval_preservation, 1.0);
    }

    #[test]
    fn inversion_mirrors_around_the_first_note() {
        let motif = Motif::new(vec![60, 64, 67]);
        let developed = develop_motif(&motif, &[Technique::Inversion], 0);
        assert_eq!(developed.notes, vec![60, 56, 53]);
    }

    #[test]
    fn augmentation_and_diminution_scale_only_the_rhythm() {
        let motif = Motif::new(vec![60, 62]);
        let doubled = develop_motif(&motif, &[Technique::Augmentation], 0);
        assert_eq!(doubled.rhythm, vec![2.0, 2.0]);
        assert_eq!(doubled.notes, motif.notes);

        let halved = develop_motif(&motif, &[Technique::Diminution], 0);
        assert_eq!(halved.rhythm, vec![0.5, 0.5]);
    }

    #[test]
    fn fragmentation_states_the_first_half_twice() {
        let motif = Motif::new(vec![60, 62, 64, 65]);
        let developed = develop_motif(&motif, &[Technique::Fragmentation], 0);
        assert_eq!(developed.notes, vec![60, 62, 60, 62]);
    }

    #[test]
    fn vocal_phrase_has_no_leap_beyond_a_fifth() {
        let mut rng = StdRng::seed_from_u64(21);
        let progression = create_progression("C", &["I", "IV", "V", "I"], 4.0, Voicing::Close);
        let phrase = create_phrase(
            &progression,
            "C",
            PhraseType::Period,
            PhraseStyle::Vocal,
            &mut rng,
        )
        .unwrap();
        for pair in phrase.melody.notes.windows(2) {
            assert!((pair[1] as i16 - pair[0] as i16).abs() <= 7);
        }
        assert_eq!(phrase.melody.notes.len(), 8);
    }

    #[test]
    fn period_phrase_plans_half_then_authentic_cadences() {
        let mut rng = StdRng::seed_from_u64(2);
        let progression = create_progression("G", &["I", "V", "vi", "IV"], 2.0, Voicing::Close);
        let phrase = create_phrase(
            &progression,
            "G",
            PhraseType::Period,
            PhraseStyle::Instrumental,
            &mut rng,
        )
        .unwrap();
        assert_eq!(phrase.cadences.len(), 2);
        assert_eq!(phrase.cadences[0].cadence, "half");
        assert_eq!(phrase.cadences[1].cadence, "authentic");
        match phrase.form {
            PhraseForm::Period {
                antecedent,
                consequent,
            } => {
                assert_eq!(antecedent, (0, 8));
                assert_eq!(consequent, (8, 16));
            }
            _ => panic!("expected a period"),
        }
    }

    #[test]
    fn sentence_phrase_breaks_into_three_spans() {
        let mut rng = StdRng::seed_from_u64(9);
        let progression = create_progression("C", &["I", "vi", "ii", "V"], 2.0, Voicing::Close);
        let phrase = create_phrase(
            &progression,
            "C",
            PhraseType::Sentence,
            PhraseStyle::Vocal,
            &mut rng,
        )
        .unwrap();
        match phrase.form {
            PhraseForm::Sentence {
                presentation,
                repetition,
                continuation,
            } => {
                assert_eq!(presentation, (0, 2));
                assert_eq!(repetition, (2, 4));
                assert_eq!(continuation, (4, 8));
            }
            _ => panic!("expected a sentence"),
        }
    }
}
