//! Ensemble arrangement: role and range assignment per instrument,
//! counter-melody construction, and texture planning over a structure.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use music_theory::progression::ChordProgression;

use crate::types::{
    Arrangement, DynamicLevel, InstrumentPart, InstrumentRole, Melody, NoteSource, Register,
    SongStructure, TexturePlan,
};
use crate::ComposeError;

#[derive(Debug, Clone, Copy)]
pub struct EnsembleSeat {
    pub name: &'static str,
    /// Inclusive MIDI range.
    pub range: (u8, u8),
    pub role: InstrumentRole,
}

const fn seat(name: &'static str, low: u8, high: u8, role: InstrumentRole) -> EnsembleSeat {
    EnsembleSeat {
        name,
        range: (low, high),
        role,
    }
}

use InstrumentRole::{Accompaniment, Bass, Harmony, Melody as Lead};

static ENSEMBLES: &[(&str, &[EnsembleSeat])] = &[
    (
        "string_quartet",
        &[
            seat("violin_1", 55, 103, Lead),
            seat("violin_2", 55, 96, Harmony),
            seat("viola", 48, 91, Accompaniment),
            seat("cello", 36, 76, Bass),
        ],
    ),
    (
        "jazz_combo",
        &[
            seat("saxophone", 49, 87, Lead),
            seat("piano", 21, 108, Harmony),
            seat("guitar", 40, 88, Accompaniment),
            seat("upright_bass", 28, 67, Bass),
        ],
    ),
    (
        "rock_band",
        &[
            seat("lead_guitar", 40, 88, Lead),
            seat("keys", 21, 108, Harmony),
            seat("rhythm_guitar", 40, 83, Accompaniment),
            seat("bass_guitar", 28, 67, Bass),
        ],
    ),
    (
        "symphony_orchestra",
        &[
            seat("flute", 60, 96, Lead),
            seat("oboe", 58, 91, Harmony),
            seat("clarinet", 50, 94, Accompaniment),
            seat("bassoon", 34, 75, Bass),
            seat("horn", 41, 77, Harmony),
            seat("trumpet", 54, 86, Harmony),
            seat("violin_1", 55, 103, Lead),
            seat("violin_2", 55, 96, Harmony),
            seat("viola", 48, 91, Accompaniment),
            seat("cello", 36, 76, Bass),
            seat("double_bass", 28, 55, Bass),
        ],
    ),
    (
        "piano_solo",
        &[
            seat("piano_right", 60, 108, Lead),
            seat("piano_left", 21, 64, Accompaniment),
        ],
    ),
    (
        "big_band",
        &[
            seat("trumpet_1", 54, 86, Lead),
            seat("trumpet_2", 54, 82, Harmony),
            seat("alto_sax", 49, 84, Harmony),
            seat("tenor_sax", 44, 80, Harmony),
            seat("trombone", 40, 72, Harmony),
            seat("baritone_sax", 36, 69, Bass),
            seat("piano", 21, 108, Accompaniment),
            seat("guitar", 40, 88, Accompaniment),
            seat("upright_bass", 28, 67, Bass),
        ],
    ),
    (
        "orchestra",
        &[
            seat("violin_1", 55, 103, Lead),
            seat("violin_2", 55, 96, Harmony),
            seat("viola", 48, 91, Accompaniment),
            seat("cello", 36, 76, Bass),
            seat("double_bass", 28, 55, Bass),
        ],
    ),
];

pub fn ensemble_seats(name: &str) -> Result<&'static [EnsembleSeat], ComposeError> {
    let lowered = name.to_ascii_lowercase();
    ENSEMBLES
        .iter()
        .find(|(n, _)| *n == lowered)
        .map(|(_, seats)| *seats)
        .ok_or_else(|| ComposeError::UnknownEnsemble(name.to_string()))
}

pub fn ensemble_names() -> Vec<&'static str> {
    ENSEMBLES.iter().map(|(n, _)| *n).collect()
}

fn clamp_into(note: u8, range: (u8, u8)) -> u8 {
    note.max(range.0).min(range.1)
}

fn register_of(range: (u8, u8)) -> Register {
    let mid = (range.0 as u16 + range.1 as u16) / 2;
    if mid < 52 {
        Register::Low
    } else if mid < 76 {
        Register::Mid
    } else {
        Register::High
    }
}

/// Chord tone nearest `prev`, folded into `range`.
fn smooth_chord_tone(prev: u8, chord_pcs: &[u8], range: (u8, u8)) -> u8 {
    let prev_i = prev as i16;
    let mut best = prev_i;
    let mut best_dist = i16::MAX;
    for &pc in chord_pcs {
        let base = prev_i - prev_i.rem_euclid(12) + pc as i16;
        for cand in [base - 12, base, base + 12] {
            let dist = (cand - prev_i).abs();
            if (range.0 as i16..=range.1 as i16).contains(&cand) && dist < best_dist {
                best = cand;
                best_dist = dist;
            }
        }
    }
    clamp_into(best.clamp(0, 127) as u8, range)
}

fn mix_level(role: InstrumentRole) -> f64 {
    match role {
        InstrumentRole::Melody => 0.9,
        InstrumentRole::Bass => 0.8,
        InstrumentRole::Harmony => 0.6,
        InstrumentRole::Accompaniment => 0.5,
    }
}

fn articulation_for(role: InstrumentRole, style: &str) -> String {
    if style == "jazz" {
        return "swing".to_string();
    }
    match role {
        InstrumentRole::Melody => "legato",
        InstrumentRole::Accompaniment => "staccato",
        InstrumentRole::Harmony | InstrumentRole::Bass => "sustained",
    }
    .to_string()
}

/// Arrange a melody and progression for a named ensemble. Melody seats
/// copy the main line, harmony seats track the nearest chord tone per
/// chord, bass seats fold roots into their range, accompaniment seats
/// arpeggiate. Every note is clamped into the seat's range.
pub fn arrange(
    melody: &Melody,
    harmony: &ChordProgression,
    ensemble: &str,
    style: &str,
    rng: &mut impl Rng,
) -> Result<Arrangement, ComposeError> {
    let seats = ensemble_seats(ensemble)?;
    let mut parts = BTreeMap::new();
    let mut mix_balance = BTreeMap::new();

    for seat in seats {
        let (notes, rhythm): (Vec<u8>, Vec<f64>) = match seat.role {
            InstrumentRole::Melody => (
                melody
                    .notes
                    .iter()
                    .map(|&n| clamp_into(n, seat.range))
                    .collect(),
                melody.rhythm.clone(),
            ),
            InstrumentRole::Harmony => {
                let mut prev = (seat.range.0 + seat.range.1) / 2;
                let mut notes = Vec::with_capacity(harmony.len());
                for chord in &harmony.chords {
                    let note = smooth_chord_tone(prev, &chord.pitch_classes(), seat.range);
                    notes.push(note);
                    prev = note;
                }
                (notes, harmony.durations.clone())
            }
            InstrumentRole::Bass => {
                let notes = harmony
                    .chords
                    .iter()
                    .map(|c| {
                        let low = seat.range.0 as i16;
                        let pc = c.root.pitch_class() as i16;
                        // Lowest in-range note with the root's pitch class.
                        let mut n = low + (pc - low).rem_euclid(12);
                        while n > seat.range.1 as i16 {
                            n -= 12;
                        }
                        clamp_into(n.clamp(0, 127) as u8, seat.range)
                    })
                    .collect();
                (notes, harmony.durations.clone())
            }
            InstrumentRole::Accompaniment => {
                let mut notes = Vec::new();
                let mut rhythm = Vec::new();
                for (chord, &duration) in harmony.chords.iter().zip(&harmony.durations) {
                    let mut pcs = chord.pitch_classes();
                    if rng.random_bool(0.5) {
                        pcs.reverse();
                    }
                    let floor = seat.range.0.max(48).min(seat.range.1);
                    for step in 0..4usize {
                        let pc = pcs[step % pcs.len()];
                        let base = floor as i16 - (floor as i16).rem_euclid(12) + pc as i16;
                        let note = if base < floor as i16 { base + 12 } else { base };
                        notes.push(clamp_into(note.clamp(0, 127) as u8, seat.range));
                        rhythm.push(duration / 4.0);
                    }
                }
                (notes, rhythm)
            }
        };

        let len = notes.len();
        parts.insert(
            seat.name.to_string(),
            InstrumentPart {
                instrument: seat.name.to_string(),
                role: seat.role,
                notes,
                rhythm,
                register: register_of(seat.range),
                dynamics: vec![DynamicLevel::Mf; len],
                articulation: articulation_for(seat.role, style),
            },
        );
        mix_balance.insert(seat.name.to_string(), mix_level(seat.role));
    }

    Ok(Arrangement {
        ensemble: ensemble.to_ascii_lowercase(),
        style: style.to_string(),
        parts,
        mix_balance,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterMelody {
    pub instrument: String,
    pub melody: Melody,
    /// 1 − fraction of parallel moves against the main melody.
    pub independence: f64,
    /// Fraction of vertical intervals in the consonant set
    /// {3,4,5,7,8,9} semitones.
    pub complementarity: f64,
}

/// Build a counter-melody by contrary motion: where the main melody
/// rises, the counter falls 1-4 semitones (and vice versa), then snaps to
/// the nearest chord tone of the harmony under that point.
pub fn counter_melody(
    melody: &Melody,
    harmony: &ChordProgression,
    instrument: &str,
    rng: &mut impl Rng,
) -> CounterMelody {
    let n = melody.notes.len();
    let mut notes = Vec::with_capacity(n);

    if n > 0 && !harmony.is_empty() {
        let first_pcs = harmony.chords[0].pitch_classes();
        let start = (melody.notes[0] as i16 - 7).clamp(0, 127) as u8;
        notes.push(smooth_chord_tone(start, &first_pcs, (48, 84)));

        for i in 1..n {
            let dir = (melody.notes[i] as i16 - melody.notes[i - 1] as i16).signum();
            let dir = if dir == 0 {
                if rng.random_bool(0.5) {
                    1
                } else {
                    -1
                }
            } else {
                dir
            };
            let step = rng.random_range(1..=4) as i16;
            let prev = notes[i - 1] as i16;
            let raw = (prev - dir * step).clamp(0, 127) as u8;
            let chord_idx = i * harmony.len() / n;
            let pcs = harmony.chords[chord_idx].pitch_classes();
            notes.push(smooth_chord_tone(raw, &pcs, (48, 84)));
        }
    }

    let mut parallel = 0usize;
    let mut consonant = 0usize;
    for i in 0..notes.len() {
        if i > 0 {
            let main_dir = (melody.notes[i] as i16 - melody.notes[i - 1] as i16).signum();
            let counter_dir = (notes[i] as i16 - notes[i - 1] as i16).signum();
            if main_dir != 0 && main_dir == counter_dir {
                parallel += 1;
            }
        }
        let vertical = (melody.notes[i] as i16 - notes[i] as i16).unsigned_abs() % 12;
        if matches!(vertical, 3 | 4 | 5 | 7 | 8 | 9) {
            consonant += 1;
        }
    }

    let moves = notes.len().saturating_sub(1);
    let independence = if moves == 0 {
        1.0
    } else {
        1.0 - parallel as f64 / moves as f64
    };
    let complementarity = if notes.is_empty() {
        0.0
    } else {
        consonant as f64 / notes.len() as f64
    };

    let sources = vec![NoteSource::ChordTone; notes.len()];
    CounterMelody {
        instrument: instrument.to_string(),
        melody: Melody {
            notes,
            rhythm: melody.rhythm.clone(),
            register: Register::Mid,
            sources,
        },
        independence,
        complementarity,
    }
}

/// Technique choices per density tier.
fn techniques_for(density: &str) -> &'static [&'static str] {
    match density {
        "thin" => &["solo_line", "melody_and_pad", "duet"],
        "medium" => &["homophonic", "melody_with_comping", "broken_chords"],
        "thick" => &["full_ensemble", "octave_doubling", "layered_riffs"],
        _ => &["tutti", "unison_climax", "dense_polyphony"],
    }
}

/// Write texture metadata onto each section from a cycled dynamic plan:
/// pp/p thin, mp/mf medium, f thick, ff very thick, with a technique
/// drawn from the tier's list.
pub fn plan_texture(
    structure: &mut SongStructure,
    dynamic_plan: &[DynamicLevel],
    rng: &mut impl Rng,
) {
    if dynamic_plan.is_empty() {
        return;
    }
    for (i, section) in structure.sections.iter_mut().enumerate() {
        let dynamic = dynamic_plan[i % dynamic_plan.len()];
        let density = match dynamic {
            DynamicLevel::Pp | DynamicLevel::P => "thin",
            DynamicLevel::Mp | DynamicLevel::Mf => "medium",
            DynamicLevel::F => "thick",
            DynamicLevel::Ff => "very_thick",
        };
        let options = techniques_for(density);
        section.texture = Some(TexturePlan {
            dynamic,
            density: density.to_string(),
            technique: options[rng.random_range(0..options.len())].to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use genre_data::GenreRecord;
    use music_theory::chord::Voicing;
    use music_theory::progression::create_progression;

    use crate::structure::{create_structure, SongType};

    use super::*;

    fn fixtures() -> (Melody, ChordProgression) {
        let harmony = create_progression("C", &["I", "IV", "V", "I"], 4.0, Voicing::Close);
        let melody = Melody::from_notes(vec![72, 74, 76, 77, 76, 74, 72, 71]);
        (melody, harmony)
    }

    #[test]
    fn unknown_ensemble_is_an_error() {
        let (melody, harmony) = fixtures();
        let mut rng = StdRng::seed_from_u64(1);
        let err = arrange(&melody, &harmony, "kazoo_choir", "pop", &mut rng).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownEnsemble(_)));
    }

    #[test]
    fn every_part_stays_inside_its_range() {
        let (melody, harmony) = fixtures();
        let mut rng = StdRng::seed_from_u64(4);
        let arrangement = arrange(&melody, &harmony, "string_quartet", "classical", &mut rng)
            .unwrap();
        assert_eq!(arrangement.parts.len(), 4);
        for seat in ensemble_seats("string_quartet").unwrap() {
            let part = &arrangement.parts[seat.name];
            assert!(
                part.notes
                    .iter()
                    .all(|&n| n >= seat.range.0 && n <= seat.range.1),
                "{} out of range",
                seat.name
            );
            assert_eq!(part.notes.len(), part.rhythm.len());
            assert_eq!(part.notes.len(), part.dynamics.len());
        }
    }

    #[test]
    fn melody_seat_copies_the_main_line() {
        let (melody, harmony) = fixtures();
        let mut rng = StdRng::seed_from_u64(4);
        let arrangement = arrange(&melody, &harmony, "rock_band", "rock", &mut rng).unwrap();
        assert_eq!(arrangement.parts["lead_guitar"].notes, melody.notes);
        assert_eq!(arrangement.parts["lead_guitar"].role, InstrumentRole::Melody);
    }

    #[test]
    fn bass_seat_plays_chord_roots() {
        let (melody, harmony) = fixtures();
        let mut rng = StdRng::seed_from_u64(4);
        let arrangement = arrange(&melody, &harmony, "jazz_combo", "jazz", &mut rng).unwrap();
        let bass = &arrangement.parts["upright_bass"];
        let root_pcs: Vec<u8> = harmony.chords.iter().map(|c| c.root.pitch_class()).collect();
        let played_pcs: Vec<u8> = bass.notes.iter().map(|&n| n % 12).collect();
        assert_eq!(played_pcs, root_pcs);
        assert_eq!(bass.articulation, "swing");
    }

    #[test]
    fn accompaniment_arpeggiates_chord_tones() {
        let (melody, harmony) = fixtures();
        let mut rng = StdRng::seed_from_u64(4);
        let arrangement = arrange(&melody, &harmony, "piano_solo", "pop", &mut rng).unwrap();
        let left = &arrangement.parts["piano_left"];
        assert_eq!(left.notes.len(), harmony.len() * 4);
        for (i, chord) in harmony.chords.iter().enumerate() {
            let pcs = chord.pitch_classes();
            for &n in &left.notes[i * 4..(i + 1) * 4] {
                assert!(pcs.contains(&(n % 12)), "note {n} not a tone of chord {i}");
            }
        }
    }

    #[test]
    fn counter_melody_moves_against_the_main_line() {
        let (melody, harmony) = fixtures();
        let mut rng = StdRng::seed_from_u64(17);
        let counter = counter_melody(&melody, &harmony, "viola", &mut rng);
        assert_eq!(counter.melody.notes.len(), melody.notes.len());
        assert!((0.0..=1.0).contains(&counter.independence));
        assert!((0.0..=1.0).contains(&counter.complementarity));
        // Counter notes come from the harmony under each point.
        let n = melody.notes.len();
        for (i, &note) in counter.melody.notes.iter().enumerate() {
            let chord_idx = if i == 0 { 0 } else { i * harmony.len() / n };
            assert!(harmony.chords[chord_idx]
                .pitch_classes()
                .contains(&(note % 12)));
        }
    }

    #[test]
    fn texture_plan_maps_dynamics_to_density_tiers() {
        let record = GenreRecord::default_for("pop");
        let mut structure = create_structure(&record, "C", SongType::Ballad, 180.0);
        let mut rng = StdRng::seed_from_u64(8);
        plan_texture(
            &mut structure,
            &[DynamicLevel::P, DynamicLevel::Ff],
            &mut rng,
        );
        let textures: Vec<&TexturePlan> = structure
            .sections
            .iter()
            .map(|s| s.texture.as_ref().unwrap())
            .collect();
        assert_eq!(textures[0].density, "thin");
        assert_eq!(textures[1].density, "very_thick");
        assert!(techniques_for("thin").contains(&textures[0].technique.as_str()));
    }
}
