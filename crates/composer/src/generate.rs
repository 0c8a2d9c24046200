//! Genre-parameterized generation of progressions, melodies, beats, and
//! bass lines. Everything stochastic takes `&mut impl Rng` so callers can
//! seed for reproducible output.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use genre_data::{GenreStore, RhythmSpec};
use music_theory::backend::{default_backend, TheoryBackend};
use music_theory::chord::Voicing;
use music_theory::key::{parse_key, KeyMode};
use music_theory::note::{note_name, FLAT_KEY_ROOTS};
use music_theory::progression::{create_progression, ChordProgression};

use crate::types::{BeatPattern, Melody, NoteSource, Register};
use crate::ComposeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MelodyStyle {
    Simple,
    Typical,
    Complex,
}

impl MelodyStyle {
    /// Unrecognized names fall back to the typical style.
    pub fn from_name(name: &str) -> MelodyStyle {
        match name.to_ascii_lowercase().as_str() {
            "simple" => MelodyStyle::Simple,
            "complex" => MelodyStyle::Complex,
            _ => MelodyStyle::Typical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    pub fn from_name(name: &str) -> Complexity {
        match name.to_ascii_lowercase().as_str() {
            "simple" => Complexity::Simple,
            "complex" => Complexity::Complex,
            _ => Complexity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BassStyle {
    Simple,
    Walking,
}

/// Mid-register band for generated melodies (C4..C6).
const MELODY_LOW: u8 = 60;
const MELODY_HIGH: u8 = 84;

/// Bass register floor (C2).
const BASS_LOW: u8 = 36;

/// Place `pc` in the octave nearest `prev`, folded into `[low, high]`.
fn nearest_in_band(prev: u8, pc: u8, low: u8, high: u8) -> u8 {
    let prev = prev as i16;
    let base = prev - prev.rem_euclid(12) + pc as i16;
    let mut best = base;
    for cand in [base - 12, base + 12] {
        if (cand - prev).abs() < (best - prev).abs() {
            best = cand;
        }
    }
    let (low, high) = (low as i16, high as i16);
    while best < low {
        best += 12;
    }
    while best > high {
        best -= 12;
    }
    best.clamp(0, 127) as u8
}

/// Genre-aware composer over the theory layer and the genre store.
pub struct Composer {
    genres: Arc<GenreStore>,
    backend: Arc<dyn TheoryBackend>,
}

impl Composer {
    pub fn new(genres: Arc<GenreStore>) -> Composer {
        Composer {
            genres,
            backend: default_backend(),
        }
    }

    /// Substitute a theory backend, mainly for tests.
    pub fn with_backend(genres: Arc<GenreStore>, backend: Arc<dyn TheoryBackend>) -> Composer {
        Composer { genres, backend }
    }

    pub fn genres(&self) -> &Arc<GenreStore> {
        &self.genres
    }

    /// Build a progression from the genre's named pattern, cyclically
    /// repeated then truncated to `bars` chords (one chord per bar) when a
    /// bar target is given. A genre with no usable pattern yields an empty
    /// progression rather than an error.
    pub fn create_progression(
        &self,
        genre: &str,
        key: &str,
        variation: &str,
        bars: Option<u32>,
    ) -> Result<ChordProgression, ComposeError> {
        let record = self.genres.get(genre)?;
        let pattern = record
            .progression(variation)
            .or_else(|| record.progression("standard"))
            .or_else(|| record.progressions.values().next());

        let Some(pattern) = pattern else {
            debug!(genre, "genre record has no progressions");
            return Ok(ChordProgression {
                chords: Vec::new(),
                key: key.to_string(),
                roman_numerals: Vec::new(),
                durations: Vec::new(),
            });
        };

        let base: Vec<&str> = pattern.pattern.iter().map(String::as_str).collect();
        if base.is_empty() {
            debug!(genre, variation, "empty progression pattern");
            return Ok(ChordProgression {
                chords: Vec::new(),
                key: key.to_string(),
                roman_numerals: Vec::new(),
                durations: Vec::new(),
            });
        }

        let mut numerals = base.clone();
        if let Some(bars) = bars {
            while numerals.len() < bars as usize {
                numerals.extend(base.iter().copied());
            }
            numerals.truncate(bars as usize);
        }

        Ok(create_progression(key, &numerals, 4.0, Voicing::Close))
    }

    /// Two notes per chord, biased toward chord tones. Typical style draws
    /// chord tones 60% of the time and scale tones otherwise; simple style
    /// stays on chord tones; complex style admits chromatic neighbors. Each
    /// note's provenance is recorded for later analysis.
    pub fn create_melody(
        &self,
        genre: &str,
        key: &str,
        progression: &ChordProgression,
        style: MelodyStyle,
        rng: &mut impl Rng,
    ) -> Result<Melody, ComposeError> {
        let record = self.genres.get(genre)?;
        let (key_pc, mode) = parse_key(key)?;
        let root_name = note_name(key_pc, FLAT_KEY_ROOTS.contains(&key_pc));
        let mode_scale = match mode {
            KeyMode::Major => "major",
            KeyMode::Minor => "natural_minor",
        };

        // Prefer the genre's characteristic scale when the backend knows
        // it, otherwise the plain key scale.
        let scale = record
            .scales
            .iter()
            .find_map(|s| self.backend.scale(root_name, s, 4).ok())
            .map(Ok)
            .unwrap_or_else(|| self.backend.scale(root_name, mode_scale, 4))?;
        let scale_pcs = scale.pitch_classes();

        let notes_per_chord = 2usize;
        let mut notes = Vec::new();
        let mut rhythm = Vec::new();
        let mut sources = Vec::new();
        let mut prev: u8 = 72;

        for (chord, &duration) in progression.chords.iter().zip(&progression.durations) {
            let chord_pcs = chord.pitch_classes();
            for _ in 0..notes_per_chord {
                let (note, source) = match style {
                    MelodyStyle::Simple => {
                        let pc = chord_pcs[rng.random_range(0..chord_pcs.len())];
                        (
                            nearest_in_band(prev, pc, MELODY_LOW, MELODY_HIGH),
                            NoteSource::ChordTone,
                        )
                    }
                    MelodyStyle::Typical => {
                        if rng.random_bool(0.6) {
                            let pc = chord_pcs[rng.random_range(0..chord_pcs.len())];
                            (
                                nearest_in_band(prev, pc, MELODY_LOW, MELODY_HIGH),
                                NoteSource::ChordTone,
                            )
                        } else {
                            let pc = scale_pcs[rng.random_range(0..scale_pcs.len())];
                            (
                                nearest_in_band(prev, pc, MELODY_LOW, MELODY_HIGH),
                                NoteSource::ScaleTone,
                            )
                        }
                    }
                    MelodyStyle::Complex => {
                        let roll: f64 = rng.random_range(0.0..1.0);
                        if roll < 0.5 {
                            let pc = chord_pcs[rng.random_range(0..chord_pcs.len())];
                            (
                                nearest_in_band(prev, pc, MELODY_LOW, MELODY_HIGH),
                                NoteSource::ChordTone,
                            )
                        } else if roll < 0.85 {
                            let pc = scale_pcs[rng.random_range(0..scale_pcs.len())];
                            (
                                nearest_in_band(prev, pc, MELODY_LOW, MELODY_HIGH),
                                NoteSource::ScaleTone,
                            )
                        } else {
                            let up = rng.random_bool(0.5);
                            let neighbor = if up {
                                (prev as i16 + 1).min(MELODY_HIGH as i16)
                            } else {
                                (prev as i16 - 1).max(MELODY_LOW as i16)
                            };
                            (neighbor as u8, NoteSource::Chromatic)
                        }
                    }
                };
                notes.push(note);
                rhythm.push(duration / notes_per_chord as f64);
                sources.push(source);
                prev = note;
            }
        }

        Ok(Melody {
            notes,
            rhythm,
            register: Register::Mid,
            sources,
        })
    }

    /// One bar of 4/4 at the genre's subdivision: kick on the genre's
    /// emphasis beats, snare on 2 and 4 (just 2 when simple), hi-hat
    /// density scaling with complexity.
    pub fn create_beat(
        &self,
        genre: &str,
        tempo: Option<u32>,
        complexity: Complexity,
        variation: &str,
    ) -> Result<BeatPattern, ComposeError> {
        let record = self.genres.get(genre)?;
        let rhythm = record
            .rhythms
            .get(variation)
            .or_else(|| record.rhythms.get("basic"))
            .cloned()
            .unwrap_or_else(|| {
                warn!(genre, variation, "no rhythm spec, using straight feel");
                RhythmSpec::straight()
            });

        let spb = rhythm.subdivision.max(1) as usize;
        let steps = 4 * spb;
        let mut kick = vec![false; steps];
        let mut snare = vec![false; steps];
        let mut hihat = vec![false; steps];

        for &beat in &rhythm.emphasis {
            if (1..=4).contains(&beat) {
                kick[(beat as usize - 1) * spb] = true;
            }
        }
        // Syncopated feels push an extra kick on the offbeat before 3.
        if rhythm.feel == "syncopated" && spb >= 2 {
            kick[2 * spb - spb / 2] = true;
        }

        snare[spb] = true;
        if complexity != Complexity::Simple {
            snare[3 * spb] = true;
        }

        for (step, hit) in hihat.iter_mut().enumerate() {
            let within = step % spb;
            *hit = match complexity {
                Complexity::Simple => within == 0,
                Complexity::Medium => within == 0 || within == spb / 2,
                Complexity::Complex => true,
            };
        }

        Ok(BeatPattern {
            tempo: tempo.unwrap_or_else(|| record.typical_tempo()),
            steps_per_beat: spb as u8,
            kick,
            snare,
            hihat,
            feel: rhythm.feel,
        })
    }

    /// Root per chord; walking style lands a chromatic passing tone on the
    /// last beat of each chord, approaching the next root.
    pub fn create_bass_line(
        &self,
        progression: &ChordProgression,
        style: BassStyle,
        rng: &mut impl Rng,
    ) -> Melody {
        let roots: Vec<u8> = progression
            .chords
            .iter()
            .map(|c| BASS_LOW + c.root.pitch_class())
            .collect();

        let mut notes = Vec::new();
        let mut rhythm = Vec::new();
        let mut sources = Vec::new();

        for (i, (&root, &duration)) in roots.iter().zip(&progression.durations).enumerate() {
            match style {
                BassStyle::Simple => {
                    notes.push(root);
                    rhythm.push(duration);
                    sources.push(NoteSource::ChordTone);
                }
                BassStyle::Walking => {
                    let next = roots[(i + 1) % roots.len()] as i16;
                    let current = root as i16;
                    let passing = if next > current {
                        next - 1
                    } else if next < current {
                        next + 1
                    } else if rng.random_bool(0.5) {
                        next + 1
                    } else {
                        next - 1
                    };

                    if duration > 1.0 {
                        notes.push(root);
                        rhythm.push(duration - 1.0);
                        sources.push(NoteSource::ChordTone);
                        notes.push(passing.clamp(0, 127) as u8);
                        rhythm.push(1.0);
                        sources.push(NoteSource::Chromatic);
                    } else {
                        notes.push(root);
                        rhythm.push(duration);
                        sources.push(NoteSource::ChordTone);
                    }
                }
            }
        }

        Melody {
            notes,
            rhythm,
            register: Register::Low,
            sources,
        }
    }
}
