use serde::{Deserialize, Serialize};

use crate::error::TheoryError;

pub const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
pub const NOTE_NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Pitch classes conventionally spelled with flats.
pub const FLAT_KEY_ROOTS: [u8; 6] = [1, 3, 5, 6, 8, 10]; // Db, Eb, F, Gb, Ab, Bb

/// Spell a pitch class as a note name.
pub fn note_name(pitch_class: u8, use_flats: bool) -> &'static str {
    let idx = (pitch_class % 12) as usize;
    if use_flats {
        NOTE_NAMES_FLAT[idx]
    } else {
        NOTE_NAMES_SHARP[idx]
    }
}

/// Parse a note or key-root name ("C", "F#", "Bb") into a pitch class 0-11.
///
/// Accepts one letter plus an optional single accidental. Anything after
/// the accidental is ignored so callers can pass chord symbols or key
/// names ("Cmaj7", "Am") and get the root pitch class.
pub fn pitch_class_of(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars();
    let letter = chars.next()?;
    let base: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental = match chars.next() {
        Some('#') => 1,
        Some('b') => -1,
        _ => 0,
    };
    Some((base + accidental).rem_euclid(12) as u8)
}

/// A single pitch. Immutable value type derived from a MIDI number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI note number 0-127.
    pub midi: u8,
    /// Spelled name without octave: "C", "F#", "Bb".
    pub name: String,
    /// Scientific pitch octave: middle C (60) is octave 4.
    pub octave: i8,
}

impl Note {
    /// Build a note from a MIDI number. Fails when out of the 0-127 range.
    pub fn from_midi(midi: u16, prefer_flats: bool) -> Result<Note, TheoryError> {
        if midi > 127 {
            return Err(TheoryError::MidiOutOfRange(midi));
        }
        let midi = midi as u8;
        Ok(Note {
            midi,
            name: note_name(midi % 12, prefer_flats).to_string(),
            octave: (midi / 12) as i8 - 1,
        })
    }

    /// Build from a note name plus octave ("C", 4 → MIDI 60).
    pub fn from_name(name: &str, octave: i8) -> Result<Note, TheoryError> {
        let pc = pitch_class_of(name).ok_or_else(|| TheoryError::UnknownKey(name.to_string()))?;
        let midi = (octave as i32 + 1) * 12 + pc as i32;
        if !(0..=127).contains(&midi) {
            return Err(TheoryError::MidiOutOfRange(midi.max(0) as u16));
        }
        let use_flats = name.contains('b');
        Note::from_midi(midi as u16, use_flats)
    }

    pub fn pitch_class(&self) -> u8 {
        self.midi % 12
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalQuality {
    Perfect,
    Major,
    Minor,
    Augmented,
    Diminished,
}

/// An interval class between two pitches, reduced modulo the octave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub semitones: u8,
    pub name: String,
    pub quality: IntervalQuality,
}

/// Interval-class names and qualities, indexed by semitone distance 0-11.
///
/// 6 semitones is reported as an augmented fourth unconditionally; a
/// diminished fifth is equally valid but distinguishing them would need
/// spelling context the pitch-class model does not carry.
const INTERVAL_TABLE: [(&str, IntervalQuality); 12] = [
    ("unison", IntervalQuality::Perfect),
    ("minor second", IntervalQuality::Minor),
    ("major second", IntervalQuality::Major),
    ("minor third", IntervalQuality::Minor),
    ("major third", IntervalQuality::Major),
    ("perfect fourth", IntervalQuality::Perfect),
    ("augmented fourth", IntervalQuality::Augmented),
    ("perfect fifth", IntervalQuality::Perfect),
    ("minor sixth", IntervalQuality::Minor),
    ("major sixth", IntervalQuality::Major),
    ("minor seventh", IntervalQuality::Minor),
    ("major seventh", IntervalQuality::Major),
];

/// Classify the interval between two notes, octave-reduced.
pub fn interval_between(a: &Note, b: &Note) -> Interval {
    let semitones = (a.midi as i16 - b.midi as i16).unsigned_abs() as u8 % 12;
    let (name, quality) = INTERVAL_TABLE[semitones as usize];
    Interval {
        semitones,
        name: name.to_string(),
        quality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn middle_c_from_midi() {
        let note = Note::from_midi(60, false).unwrap();
        assert_eq!(note.name, "C");
        assert_eq!(note.octave, 4);
        assert_eq!(note.pitch_class(), 0);
    }

    #[test]
    fn midi_roundtrip_full_range() {
        for n in 0..=127u16 {
            let note = Note::from_midi(n, false).unwrap();
            assert_eq!(note.midi as u16, n);
        }
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(Note::from_midi(128, false).is_err());
    }

    #[test]
    fn flat_spelling() {
        let note = Note::from_midi(61, true).unwrap();
        assert_eq!(note.name, "Db");
        let sharp = Note::from_midi(61, false).unwrap();
        assert_eq!(sharp.name, "C#");
    }

    #[test]
    fn from_name_matches_midi() {
        let note = Note::from_name("A", 4).unwrap();
        assert_eq!(note.midi, 69);
        let flat = Note::from_name("Bb", 3).unwrap();
        assert_eq!(flat.midi, 58);
    }

    #[test]
    fn pitch_class_parsing() {
        assert_eq!(pitch_class_of("C"), Some(0));
        assert_eq!(pitch_class_of("F#"), Some(6));
        assert_eq!(pitch_class_of("Bb"), Some(10));
        assert_eq!(pitch_class_of("Cb"), Some(11));
        assert_eq!(pitch_class_of("Am"), Some(9));
        assert_eq!(pitch_class_of("H"), None);
    }

    #[test]
    fn interval_qualities() {
        let c = Note::from_midi(60, false).unwrap();
        let g = Note::from_midi(67, false).unwrap();
        let fifth = interval_between(&c, &g);
        assert_eq!(fifth.semitones, 7);
        assert_eq!(fifth.quality, IntervalQuality::Perfect);
        assert_eq!(fifth.name, "perfect fifth");

        let e = Note::from_midi(64, false).unwrap();
        let third = interval_between(&c, &e);
        assert_eq!(third.quality, IntervalQuality::Major);

        // Direction does not matter
        let inverted = interval_between(&g, &c);
        assert_eq!(inverted.semitones, 7);
    }

    #[test]
    fn tritone_reported_augmented() {
        let c = Note::from_midi(60, false).unwrap();
        let fs = Note::from_midi(66, false).unwrap();
        let tritone = interval_between(&c, &fs);
        assert_eq!(tritone.quality, IntervalQuality::Augmented);
    }
}
