use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TheoryError;
use crate::note::{note_name, pitch_class_of, Note, FLAT_KEY_ROOTS};

/// A chord interval pattern: suffix, semitone offsets from the root
/// (ascending, extensions above 12), and a coarse quality label.
pub struct ChordPattern {
    pub suffix: &'static str,
    pub intervals: &'static [u8],
    pub quality: &'static str,
}

/// All recognized chord types, keyed by canonical symbol suffix.
pub static CHORD_PATTERNS: &[ChordPattern] = &[
    ChordPattern { suffix: "major", intervals: &[0, 4, 7], quality: "major" },
    ChordPattern { suffix: "minor", intervals: &[0, 3, 7], quality: "minor" },
    ChordPattern { suffix: "dim", intervals: &[0, 3, 6], quality: "diminished" },
    ChordPattern { suffix: "aug", intervals: &[0, 4, 8], quality: "augmented" },
    ChordPattern { suffix: "sus2", intervals: &[0, 2, 7], quality: "suspended" },
    ChordPattern { suffix: "sus4", intervals: &[0, 5, 7], quality: "suspended" },
    ChordPattern { suffix: "5", intervals: &[0, 7], quality: "power" },
    ChordPattern { suffix: "6", intervals: &[0, 4, 7, 9], quality: "major" },
    ChordPattern { suffix: "m6", intervals: &[0, 3, 7, 9], quality: "minor" },
    ChordPattern { suffix: "7", intervals: &[0, 4, 7, 10], quality: "dominant" },
    ChordPattern { suffix: "maj7", intervals: &[0, 4, 7, 11], quality: "major" },
    ChordPattern { suffix: "m7", intervals: &[0, 3, 7, 10], quality: "minor" },
    ChordPattern { suffix: "m(maj7)", intervals: &[0, 3, 7, 11], quality: "minor" },
    ChordPattern { suffix: "dim7", intervals: &[0, 3, 6, 9], quality: "diminished" },
    ChordPattern { suffix: "m7b5", intervals: &[0, 3, 6, 10], quality: "diminished" },
    ChordPattern { suffix: "aug7", intervals: &[0, 4, 8, 10], quality: "augmented" },
    ChordPattern { suffix: "7sus4", intervals: &[0, 5, 7, 10], quality: "suspended" },
    ChordPattern { suffix: "add9", intervals: &[0, 4, 7, 14], quality: "major" },
    ChordPattern { suffix: "madd9", intervals: &[0, 3, 7, 14], quality: "minor" },
    ChordPattern { suffix: "6/9", intervals: &[0, 4, 7, 9, 14], quality: "major" },
    ChordPattern { suffix: "9", intervals: &[0, 4, 7, 10, 14], quality: "dominant" },
    ChordPattern { suffix: "maj9", intervals: &[0, 4, 7, 11, 14], quality: "major" },
    ChordPattern { suffix: "m9", intervals: &[0, 3, 7, 10, 14], quality: "minor" },
    ChordPattern { suffix: "7b9", intervals: &[0, 4, 7, 10, 13], quality: "dominant" },
    ChordPattern { suffix: "7#9", intervals: &[0, 4, 7, 10, 15], quality: "dominant" },
    ChordPattern { suffix: "11", intervals: &[0, 4, 7, 10, 14, 17], quality: "dominant" },
    ChordPattern { suffix: "m11", intervals: &[0, 3, 7, 10, 14, 17], quality: "minor" },
    ChordPattern { suffix: "13", intervals: &[0, 4, 7, 10, 14, 21], quality: "dominant" },
    ChordPattern { suffix: "maj13", intervals: &[0, 4, 7, 11, 14, 21], quality: "major" },
    ChordPattern { suffix: "m13", intervals: &[0, 3, 7, 10, 14, 21], quality: "minor" },
];

/// Look up a chord pattern by canonical suffix.
pub fn chord_pattern(chord_type: &str) -> Option<&'static ChordPattern> {
    CHORD_PATTERNS.iter().find(|p| p.suffix == chord_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordType {
    Triad,
    Seventh,
    Ninth,
    Eleventh,
    Thirteenth,
}

impl ChordType {
    /// Classify by the widest extension present in the interval set.
    fn from_intervals(intervals: &[u8]) -> ChordType {
        let top = intervals.iter().copied().max().unwrap_or(0);
        match top {
            0..=9 => ChordType::Triad,
            10..=13 => ChordType::Seventh,
            14..=16 => ChordType::Ninth,
            17..=20 => ChordType::Eleventh,
            _ => ChordType::Thirteenth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voicing {
    Close,
    Open,
    Drop2,
    Drop3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    pub root: Note,
    pub quality: String,
    pub chord_type: ChordType,
    /// Ascending; may span octaves depending on voicing.
    pub notes: Vec<Note>,
    /// "C", "Dm7", "G7sus4", ...
    pub symbol: String,
    pub inversion: u8,
    pub voicing: Voicing,
}

impl Chord {
    pub fn pitch_classes(&self) -> Vec<u8> {
        let mut pcs: Vec<u8> = self.notes.iter().map(|n| n.pitch_class()).collect();
        pcs.sort_unstable();
        pcs.dedup();
        pcs
    }
}

/// Build a chord from a root name and chord type.
///
/// Inversion rotates the lowest note up an octave, applied `inversion`
/// times. Voicing transforms run after inversion: open raises the inner
/// voices an octave, drop2/drop3 lower the 2nd/3rd voice from the top an
/// octave and re-sort ascending.
pub fn build_chord(
    root: &str,
    chord_type: &str,
    inversion: u8,
    voicing: Voicing,
    octave: i8,
) -> Result<Chord, TheoryError> {
    let pattern = chord_pattern(chord_type)
        .ok_or_else(|| TheoryError::UnknownChordType(chord_type.to_string()))?;
    let root_pc =
        pitch_class_of(root).ok_or_else(|| TheoryError::UnknownKey(root.to_string()))?;
    let use_flats = root.contains('b') || FLAT_KEY_ROOTS.contains(&root_pc);

    let root_midi = (octave as i32 + 1) * 12 + root_pc as i32;
    let mut midis: Vec<i32> = pattern
        .intervals
        .iter()
        .map(|&iv| root_midi + iv as i32)
        .collect();

    for _ in 0..inversion {
        let low = midis.remove(0);
        midis.push(low + 12);
    }

    apply_voicing(&mut midis, voicing);

    let mut notes = Vec::with_capacity(midis.len());
    for m in &midis {
        if !(0..=127).contains(m) {
            return Err(TheoryError::MidiOutOfRange((*m).max(0) as u16));
        }
        notes.push(Note::from_midi(*m as u16, use_flats)?);
    }

    let root_note = Note::from_name(root, octave)?;
    let suffix = if pattern.suffix == "major" { "" } else if pattern.suffix == "minor" { "m" } else { pattern.suffix };

    Ok(Chord {
        symbol: format!("{}{}", root_note.name, suffix),
        root: root_note,
        quality: pattern.quality.to_string(),
        chord_type: ChordType::from_intervals(pattern.intervals),
        notes,
        inversion,
        voicing,
    })
}

fn apply_voicing(midis: &mut Vec<i32>, voicing: Voicing) {
    match voicing {
        Voicing::Close => {}
        Voicing::Open => {
            // Raise every inner voice an octave, keeping the outer voices put
            let len = midis.len();
            if len > 2 {
                for m in midis.iter_mut().take(len - 1).skip(1) {
                    *m += 12;
                }
            }
        }
        Voicing::Drop2 => {
            let len = midis.len();
            if len >= 2 {
                midis[len - 2] -= 12;
            }
        }
        Voicing::Drop3 => {
            let len = midis.len();
            if len >= 3 {
                midis[len - 3] -= 12;
            }
        }
    }
    midis.sort_unstable();
}

/// One candidate from chord analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordMatch {
    pub root: String,
    pub chord_type: String,
    pub symbol: String,
    pub confidence: f64,
}

/// Identify which chords a set of MIDI notes could be.
///
/// Every sounding pitch class is tried as the root; interval sets are
/// scored against every known pattern by `2*common - missing - 0.5*extra`,
/// requiring at least 3 matched intervals and 0.5 confidence. The lowest
/// sounding note earns a small root bonus, which settles enharmonic ties
/// like Am7 vs. C6. Top 3 candidates, best first.
pub fn analyze_chord(midi_notes: &[u8]) -> Result<Vec<ChordMatch>, TheoryError> {
    if midi_notes.len() < 3 {
        return Err(TheoryError::InsufficientNotes {
            needed: 3,
            got: midi_notes.len(),
        });
    }

    let mut pcs: Vec<u8> = midi_notes.iter().map(|n| n % 12).collect();
    pcs.sort_unstable();
    pcs.dedup();

    let bass_pc = midi_notes.iter().min().map(|n| n % 12);

    let mut matches: Vec<(f64, ChordMatch)> = Vec::new();
    for &root in &pcs {
        let intervals: Vec<u8> = pcs.iter().map(|&pc| (pc + 12 - root) % 12).collect();

        for pattern in CHORD_PATTERNS {
            let wanted: Vec<u8> = pattern.intervals.iter().map(|&iv| iv % 12).collect();
            let common = wanted.iter().filter(|iv| intervals.contains(iv)).count();
            if common < 3 {
                continue;
            }
            let missing = wanted.len() - common;
            let extra = intervals.iter().filter(|iv| !wanted.contains(iv)).count();

            let score = 2.0 * common as f64 - missing as f64 - 0.5 * extra as f64;
            let mut ranked = score / (2.0 * wanted.len() as f64);
            if bass_pc == Some(root) {
                ranked += 0.05;
            }
            let confidence = ranked.clamp(0.0, 1.0);
            if confidence <= 0.5 {
                continue;
            }

            let use_flats = FLAT_KEY_ROOTS.contains(&root);
            let root_name = note_name(root, use_flats);
            let suffix = match pattern.suffix {
                "major" => "",
                "minor" => "m",
                s => s,
            };
            matches.push((
                ranked,
                ChordMatch {
                    root: root_name.to_string(),
                    chord_type: pattern.suffix.to_string(),
                    symbol: format!("{}{}", root_name, suffix),
                    confidence,
                },
            ));
        }
    }

    matches.sort_by(|a, b| b.0.total_cmp(&a.0));
    matches.truncate(3);
    Ok(matches.into_iter().map(|(_, m)| m).collect())
}

/// Split a chord symbol into root name and type suffix.
///
/// Unrecognized suffixes fall back to a plain major triad rather than
/// erroring; the loss is logged.
pub fn parse_chord_symbol(symbol: &str) -> (String, &'static ChordPattern) {
    let trimmed = symbol.trim();
    let mut root_len = 0;
    let bytes = trimmed.as_bytes();
    if !bytes.is_empty() && (bytes[0] as char).is_ascii_alphabetic() {
        root_len = 1;
        if bytes.len() > 1 && (bytes[1] == b'#' || bytes[1] == b'b') {
            root_len = 2;
        }
    }
    let (root, suffix) = trimmed.split_at(root_len);
    let root = if root.is_empty() { "C" } else { root };

    let canonical = match suffix {
        "" | "maj" | "M" => "major",
        "m" | "min" | "-" => "minor",
        "o" | "°" => "dim",
        "+" => "aug",
        "ø" | "ø7" | "m7(b5)" => "m7b5",
        "mmaj7" | "minmaj7" => "m(maj7)",
        "M7" => "maj7",
        "min7" => "m7",
        other => other,
    };

    match chord_pattern(canonical) {
        Some(pattern) => (root.to_string(), pattern),
        None => {
            debug!(symbol, "unrecognized chord suffix, treating as major triad");
            (root.to_string(), chord_pattern("major").expect("major triad pattern exists"))
        }
    }
}

/// Core tones, extensions, and avoid notes for a chord symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordToneBreakdown {
    pub symbol: String,
    pub chord_type: String,
    /// Tones within the first octave of the root.
    pub chord_tones: Vec<String>,
    /// Tones above the octave (9ths, 11ths, 13ths).
    pub extensions: Vec<String>,
    /// Scale tones that clash with this chord quality.
    pub avoid_notes: Vec<String>,
}

/// Avoid-note table keyed by canonical chord type.
static AVOID_NOTES: &[(&str, &[&str])] = &[
    ("major", &["perfect fourth"]),
    ("maj7", &["perfect fourth"]),
    ("6", &["perfect fourth"]),
    ("7", &["major seventh"]),
    ("9", &["major seventh"]),
    ("13", &["perfect fourth"]),
    ("minor", &["major sixth"]),
    ("m7", &["minor sixth"]),
    ("m9", &["minor sixth"]),
];

/// Break a chord symbol into core tones vs. extensions, with avoid notes.
pub fn chord_tones_and_extensions(symbol: &str) -> ChordToneBreakdown {
    let (root, pattern) = parse_chord_symbol(symbol);
    let root_pc = pitch_class_of(&root).unwrap_or(0);
    let use_flats = root.contains('b') || FLAT_KEY_ROOTS.contains(&root_pc);

    let mut chord_tones = Vec::new();
    let mut extensions = Vec::new();
    for &iv in pattern.intervals {
        // Lowered degrees (b3, b5, b7, b9, b13) spell flat regardless of
        // the root's key signature.
        let lowered = matches!(iv % 12, 1 | 3 | 6 | 8 | 10);
        let name = note_name(root_pc + iv % 12, use_flats || lowered).to_string();
        if iv <= 12 {
            chord_tones.push(name);
        } else {
            extensions.push(name);
        }
    }

    let avoid_notes = AVOID_NOTES
        .iter()
        .find(|(suffix, _)| *suffix == pattern.suffix)
        .map(|(_, notes)| notes.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default();

    ChordToneBreakdown {
        symbol: symbol.to_string(),
        chord_type: pattern.suffix.to_string(),
        chord_tones,
        extensions,
        avoid_notes,
    }
}

/// A substitution suggestion with the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub symbol: String,
    pub description: String,
}

/// Suggest chord substitutions for a symbol in a stylistic context.
///
/// Rule-table driven: tritone substitution for dominant sevenths in jazz,
/// supertonic ii7 for major sevenths, add9 coloring in pop, and a
/// diminished passing option above any dominant.
pub fn suggest_substitutions(symbol: &str, context: &str) -> Vec<Substitution> {
    let (root, pattern) = parse_chord_symbol(symbol);
    let root_pc = pitch_class_of(&root).unwrap_or(0);
    let use_flats = FLAT_KEY_ROOTS.contains(&root_pc);
    let mut subs = Vec::new();

    if pattern.quality == "dominant" {
        if context == "jazz" {
            let tritone = note_name((root_pc + 6) % 12, use_flats);
            subs.push(Substitution {
                symbol: format!("{}7", tritone),
                description: "tritone substitution: shares the 3rd and 7th".into(),
            });
            let passing = note_name((root_pc + 1) % 12, use_flats);
            subs.push(Substitution {
                symbol: format!("{}dim7", passing),
                description: "diminished passing chord a half step above".into(),
            });
        }
        let related_ii = note_name((root_pc + 7) % 12, use_flats);
        subs.push(Substitution {
            symbol: format!("{}m7", related_ii),
            description: "related ii7: prefix to form a ii-V".into(),
        });
    }

    if pattern.suffix == "maj7" || pattern.suffix == "major" {
        let supertonic = note_name((root_pc + 2) % 12, use_flats);
        subs.push(Substitution {
            symbol: format!("{}m7", supertonic),
            description: "supertonic ii7 substitution over the same bass motion".into(),
        });
        if context == "pop" {
            subs.push(Substitution {
                symbol: format!("{}add9", note_name(root_pc, use_flats)),
                description: "add9 color keeps the triad function".into(),
            });
        }
    }

    if pattern.quality == "minor" && context == "jazz" {
        let relative = note_name((root_pc + 3) % 12, use_flats);
        subs.push(Substitution {
            symbol: format!("{}maj7", relative),
            description: "relative major seventh shares three tones".into(),
        });
    }

    subs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn major_triad_pitch_classes() {
        for root in 0..12u8 {
            let name = note_name(root, false);
            let chord = build_chord(name, "major", 0, Voicing::Close, 4).unwrap();
            let expected = vec![root, (root + 4) % 12, (root + 7) % 12];
            let mut pcs: Vec<u8> = chord.notes.iter().map(|n| n.pitch_class()).collect();
            let mut expected_sorted = expected.clone();
            pcs.sort_unstable();
            expected_sorted.sort_unstable();
            assert_eq!(pcs, expected_sorted, "root {}", name);
        }
    }

    #[test]
    fn minor_seventh_pitch_classes() {
        for root in 0..12u8 {
            let name = note_name(root, false);
            let chord = build_chord(name, "m7", 0, Voicing::Close, 3).unwrap();
            let mut pcs: Vec<u8> = chord.notes.iter().map(|n| n.pitch_class()).collect();
            pcs.sort_unstable();
            let mut expected = vec![root, (root + 3) % 12, (root + 7) % 12, (root + 10) % 12];
            expected.sort_unstable();
            assert_eq!(pcs, expected);
        }
    }

    #[test]
    fn note_count_matches_chord_type() {
        let triad = build_chord("C", "major", 0, Voicing::Close, 4).unwrap();
        assert_eq!(triad.notes.len(), 3);
        assert_eq!(triad.chord_type, ChordType::Triad);

        let seventh = build_chord("C", "maj7", 0, Voicing::Close, 4).unwrap();
        assert_eq!(seventh.notes.len(), 4);
        assert_eq!(seventh.chord_type, ChordType::Seventh);

        let thirteenth = build_chord("C", "13", 0, Voicing::Close, 3).unwrap();
        assert_eq!(thirteenth.notes.len(), 6);
        assert_eq!(thirteenth.chord_type, ChordType::Thirteenth);
    }

    #[test]
    fn first_inversion_puts_third_in_bass() {
        let chord = build_chord("C", "major", 1, Voicing::Close, 4).unwrap();
        let midis: Vec<u8> = chord.notes.iter().map(|n| n.midi).collect();
        assert_eq!(midis, vec![64, 67, 72]); // E G C
    }

    #[test]
    fn drop2_lowers_second_voice_from_top() {
        let close = build_chord("C", "maj7", 0, Voicing::Close, 4).unwrap();
        let drop2 = build_chord("C", "maj7", 0, Voicing::Drop2, 4).unwrap();
        // Close: C E G B (60 64 67 71); drop2 lowers G: G C E B
        assert_eq!(
            drop2.notes.iter().map(|n| n.midi).collect::<Vec<_>>(),
            vec![55, 60, 64, 71]
        );
        assert_eq!(close.pitch_classes(), drop2.pitch_classes());
    }

    #[test]
    fn open_voicing_keeps_outer_voices() {
        let chord = build_chord("C", "major", 0, Voicing::Open, 4).unwrap();
        let midis: Vec<u8> = chord.notes.iter().map(|n| n.midi).collect();
        assert_eq!(midis, vec![60, 67, 76]); // C G E
    }

    #[test]
    fn unknown_chord_type_rejected() {
        assert!(matches!(
            build_chord("C", "mystery", 0, Voicing::Close, 4),
            Err(TheoryError::UnknownChordType(_))
        ));
    }

    #[test]
    fn analysis_recovers_built_triads_and_sevenths() {
        for chord_type in ["major", "minor", "7", "maj7", "m7"] {
            for root in [0u8, 2, 5, 7, 9] {
                let name = note_name(root, false);
                let chord = build_chord(name, chord_type, 0, Voicing::Close, 4).unwrap();
                let midis: Vec<u8> = chord.notes.iter().map(|n| n.midi).collect();
                let matches = analyze_chord(&midis).unwrap();
                let top = &matches[0];
                assert_eq!(top.root, name, "{} {}", name, chord_type);
                assert!(top.confidence > 0.8, "confidence {}", top.confidence);
            }
        }
    }

    #[test]
    fn too_few_notes_rejected() {
        assert!(analyze_chord(&[60, 67]).is_err());
    }

    #[test]
    fn symbol_parsing_with_fallback() {
        let (root, pattern) = parse_chord_symbol("F#m7");
        assert_eq!(root, "F#");
        assert_eq!(pattern.suffix, "m7");

        // Unknown suffix silently degrades to a major triad
        let (root, pattern) = parse_chord_symbol("Cmystery");
        assert_eq!(root, "C");
        assert_eq!(pattern.suffix, "major");
    }

    #[test]
    fn tones_vs_extensions_split() {
        let breakdown = chord_tones_and_extensions("C9");
        assert_eq!(breakdown.chord_tones, vec!["C", "E", "G", "Bb"]);
        assert_eq!(breakdown.extensions, vec!["D"]);
    }

    #[test]
    fn jazz_tritone_substitution() {
        let subs = suggest_substitutions("G7", "jazz");
        assert!(subs.iter().any(|s| s.symbol == "C#7" || s.symbol == "Db7"));
    }

    #[test]
    fn pop_add9_coloring() {
        let subs = suggest_substitutions("C", "pop");
        assert!(subs.iter().any(|s| s.symbol == "Cadd9"));
    }
}
