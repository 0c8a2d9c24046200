use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chord::{build_chord, parse_chord_symbol, Chord, Voicing};
use crate::key::{parse_key, KeyMode};
use crate::note::{note_name, pitch_class_of, FLAT_KEY_ROOTS};

/// Scale-degree semitone offsets for roman numeral resolution.
const MAJOR_OFFSETS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_OFFSETS: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Chromatic-degree numerals relative to a major key, indexed by semitone.
const CHROMATIC_NUMERALS: [&str; 12] = [
    "I", "bII", "II", "bIII", "III", "IV", "bV", "V", "bVI", "VI", "bVII", "VII",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordProgression {
    pub chords: Vec<Chord>,
    pub key: String,
    /// Parallel to `chords`.
    pub roman_numerals: Vec<String>,
    /// Beats per chord, parallel to `chords`.
    pub durations: Vec<f64>,
}

impl ChordProgression {
    pub fn total_duration(&self) -> f64 {
        self.durations.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

/// A parsed roman numeral: degree, quality hints, extension suffix.
#[derive(Debug, Clone, PartialEq)]
struct ParsedNumeral {
    degree: usize,
    accidental: i8,
    lowercase: bool,
    diminished: bool,
    half_diminished: bool,
    augmented: bool,
    extension: String,
    /// Degree this chord tonicizes ("V/ii" → Some(2)).
    secondary_of: Option<usize>,
}

fn roman_degree(roman: &str) -> Option<usize> {
    match roman.to_ascii_uppercase().as_str() {
        "I" => Some(1),
        "II" => Some(2),
        "III" => Some(3),
        "IV" => Some(4),
        "V" => Some(5),
        "VI" => Some(6),
        "VII" => Some(7),
        _ => None,
    }
}

fn parse_numeral(numeral: &str) -> Option<ParsedNumeral> {
    let trimmed = numeral.trim();

    // Secondary dominant notation: "V/ii", "V7/V"
    let (head, secondary_of) = match trimmed.split_once('/') {
        Some((head, target)) => {
            let target_roman: String = target
                .chars()
                .take_while(|c| matches!(c, 'I' | 'i' | 'V' | 'v'))
                .collect();
            (head, roman_degree(&target_roman))
        }
        None => (trimmed, None),
    };

    let mut chars = head.chars().peekable();
    let accidental = match chars.peek() {
        Some('b') => {
            chars.next();
            -1
        }
        Some('#') => {
            chars.next();
            1
        }
        _ => 0,
    };

    let mut roman = String::new();
    while let Some(&c) = chars.peek() {
        if matches!(c, 'I' | 'i' | 'V' | 'v') {
            roman.push(c);
            chars.next();
        } else {
            break;
        }
    }
    let degree = roman_degree(&roman)?;
    let lowercase = roman.chars().all(|c| c.is_ascii_lowercase());

    let rest: String = chars.collect();
    let mut diminished = false;
    let mut half_diminished = false;
    let mut augmented = false;
    let mut extension = rest.clone();
    for (marker, flag) in [("°", 0), ("o", 0), ("dim", 0), ("ø", 1), ("+", 2), ("aug", 2)] {
        if let Some(stripped) = extension.strip_prefix(marker) {
            match flag {
                0 => diminished = true,
                1 => half_diminished = true,
                _ => augmented = true,
            }
            extension = stripped.to_string();
            break;
        }
    }

    Some(ParsedNumeral {
        degree,
        accidental,
        lowercase,
        diminished,
        half_diminished,
        augmented,
        extension,
        secondary_of,
    })
}

/// Resolve a parsed numeral to (root pitch class, chord type key).
fn numeral_chord(parsed: &ParsedNumeral, key_pc: u8, mode: KeyMode) -> (u8, &'static str) {
    let offsets = match mode {
        KeyMode::Major => &MAJOR_OFFSETS,
        KeyMode::Minor => &MINOR_OFFSETS,
    };

    let base = offsets[parsed.degree - 1] as i32 + parsed.accidental as i32;
    let mut root_pc = (key_pc as i32 + base).rem_euclid(12) as u8;

    // "V/x" is the dominant of degree x
    if let Some(target) = parsed.secondary_of {
        let target_pc = (key_pc as i32 + offsets[target - 1] as i32).rem_euclid(12) as u8;
        root_pc = (target_pc + offsets[parsed.degree - 1]) % 12;
    }

    let chord_type = if parsed.half_diminished {
        "m7b5"
    } else if parsed.diminished {
        if parsed.extension == "7" {
            "dim7"
        } else {
            "dim"
        }
    } else if parsed.augmented {
        if parsed.extension == "7" {
            "aug7"
        } else {
            "aug"
        }
    } else if parsed.lowercase {
        match parsed.extension.as_str() {
            "" => "minor",
            "7" => "m7",
            "6" => "m6",
            "9" => "m9",
            "maj7" => "m(maj7)",
            _ => "minor",
        }
    } else {
        match parsed.extension.as_str() {
            "" => "major",
            "7" => "7",
            "maj7" => "maj7",
            "6" => "6",
            "9" => "9",
            "maj9" => "maj9",
            "sus2" => "sus2",
            "sus4" => "sus4",
            "add9" => "add9",
            _ => "major",
        }
    };

    (root_pc, chord_type)
}

/// Build a concrete chord progression from roman numerals in a key.
///
/// Lenient by design: malformed numerals and failed chord builds degrade
/// to a plain major triad on the best-guess root instead of erroring.
pub fn create_progression(
    key: &str,
    numerals: &[&str],
    duration_per_chord: f64,
    voicing: Voicing,
) -> ChordProgression {
    let (key_pc, mode) = parse_key(key).unwrap_or_else(|_| {
        warn!(key, "unrecognized key, assuming C major");
        (0, KeyMode::Major)
    });
    let use_flats = key.contains('b') || FLAT_KEY_ROOTS.contains(&key_pc);

    let mut chords = Vec::with_capacity(numerals.len());
    let mut roman_numerals = Vec::with_capacity(numerals.len());

    for &numeral in numerals {
        let (root_pc, chord_type) = match parse_numeral(numeral) {
            Some(parsed) => numeral_chord(&parsed, key_pc, mode),
            None => {
                warn!(numeral, "malformed roman numeral, substituting tonic triad");
                (key_pc, "major")
            }
        };
        let root_name = note_name(root_pc, use_flats);

        let chord = build_chord(root_name, chord_type, 0, voicing, 4).unwrap_or_else(|e| {
            warn!(numeral, error = %e, "chord build failed, substituting major triad");
            build_chord(root_name, "major", 0, Voicing::Close, 4)
                .expect("major triad at octave 4 is always in range")
        });

        chords.push(chord);
        roman_numerals.push(numeral.to_string());
    }

    let durations = vec![duration_per_chord; chords.len()];
    ChordProgression {
        chords,
        key: key.to_string(),
        roman_numerals,
        durations,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicFunction {
    Tonic,
    Predominant,
    Dominant,
    Chromatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceType {
    Authentic,
    Plagal,
    Deceptive,
    Half,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedChord {
    pub symbol: String,
    pub roman_numeral: String,
    pub function: HarmonicFunction,
    pub is_secondary_dominant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cadence {
    /// Index of the arrival chord.
    pub position: usize,
    pub cadence_type: CadenceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionAnalysis {
    pub key: String,
    pub chords: Vec<AnalyzedChord>,
    pub cadences: Vec<Cadence>,
}

/// Infer a key from chord symbols by scanning for V→I style resolutions,
/// defaulting to the first chord's root.
fn infer_key(symbols: &[&str]) -> (u8, KeyMode) {
    for pair in symbols.windows(2) {
        let (a_root, a_pattern) = parse_chord_symbol(pair[0]);
        let (b_root, b_pattern) = parse_chord_symbol(pair[1]);
        let (Some(a_pc), Some(b_pc)) = (pitch_class_of(&a_root), pitch_class_of(&b_root)) else {
            continue;
        };
        // Root falls a fifth from a dominant-capable chord
        let is_dominant_shape = a_pattern.quality == "dominant" || a_pattern.quality == "major";
        if is_dominant_shape && (a_pc + 5) % 12 == b_pc {
            let mode = if b_pattern.quality == "minor" {
                KeyMode::Minor
            } else {
                KeyMode::Major
            };
            return (b_pc, mode);
        }
    }

    let (root, pattern) = parse_chord_symbol(symbols.first().copied().unwrap_or("C"));
    let pc = pitch_class_of(&root).unwrap_or(0);
    let mode = if pattern.quality == "minor" {
        KeyMode::Minor
    } else {
        KeyMode::Major
    };
    (pc, mode)
}

fn degree_of(pc: u8, key_pc: u8, mode: KeyMode) -> Option<usize> {
    let offsets = match mode {
        KeyMode::Major => &MAJOR_OFFSETS,
        KeyMode::Minor => &MINOR_OFFSETS,
    };
    let rel = (pc + 12 - key_pc) % 12;
    offsets.iter().position(|&off| off == rel).map(|i| i + 1)
}

fn function_of_degree(degree: usize) -> HarmonicFunction {
    match degree {
        1 | 3 | 6 => HarmonicFunction::Tonic,
        2 | 4 => HarmonicFunction::Predominant,
        _ => HarmonicFunction::Dominant,
    }
}

/// Analyze a chord-symbol sequence into roman numerals, functions, and
/// cadences relative to a key (inferred when not supplied).
pub fn analyze_progression(symbols: &[&str], key: Option<&str>) -> ProgressionAnalysis {
    let (key_pc, mode) = match key {
        Some(k) => parse_key(k).unwrap_or_else(|_| infer_key(symbols)),
        None => infer_key(symbols),
    };

    let mut chords = Vec::with_capacity(symbols.len());
    let mut degrees: Vec<Option<usize>> = Vec::with_capacity(symbols.len());

    const DEGREE_NUMERALS: [&str; 7] = ["I", "II", "III", "IV", "V", "VI", "VII"];

    for &symbol in symbols {
        let (root, pattern) = parse_chord_symbol(symbol);
        let pc = pitch_class_of(&root).unwrap_or(key_pc);
        let rel = (pc + 12 - key_pc) % 12;
        let degree = degree_of(pc, key_pc, mode);

        // A dominant-quality chord off the V degree that resolves a fifth
        // down onto a diatonic degree is tonicizing that degree.
        let target_degree = degree_of((pc + 5) % 12, key_pc, mode);
        let is_secondary_dominant = pattern.quality == "dominant"
            && degree != Some(5)
            && target_degree.is_some();

        let roman_numeral = if is_secondary_dominant {
            let target = target_degree.expect("target is diatonic");
            format!("V/{}", DEGREE_NUMERALS[target - 1])
        } else {
            match degree {
                Some(d) => {
                    decorate_numeral(DEGREE_NUMERALS[d - 1], pattern.quality, pattern.suffix)
                }
                None => decorate_numeral(
                    CHROMATIC_NUMERALS[rel as usize],
                    pattern.quality,
                    pattern.suffix,
                ),
            }
        };

        let function = if is_secondary_dominant {
            HarmonicFunction::Dominant
        } else {
            match degree {
                Some(d) => function_of_degree(d),
                None => HarmonicFunction::Chromatic,
            }
        };

        degrees.push(degree);
        chords.push(AnalyzedChord {
            symbol: symbol.to_string(),
            roman_numeral,
            function,
            is_secondary_dominant,
        });
    }

    let mut cadences = Vec::new();
    for i in 1..degrees.len() {
        let (Some(prev), Some(curr)) = (degrees[i - 1], degrees[i]) else {
            continue;
        };
        let cadence_type = match (prev, curr) {
            (5, 1) => Some(CadenceType::Authentic),
            (4, 1) => Some(CadenceType::Plagal),
            (5, 6) => Some(CadenceType::Deceptive),
            (2, 5) | (4, 5) => Some(CadenceType::Half),
            _ => None,
        };
        if let Some(cadence_type) = cadence_type {
            cadences.push(Cadence {
                position: i,
                cadence_type,
            });
        }
    }

    ProgressionAnalysis {
        key: crate::key::key_name(key_pc, mode),
        chords,
        cadences,
    }
}

/// Adjust a base numeral's case and markers to the chord's actual quality.
fn decorate_numeral(base: &str, quality: &str, suffix: &str) -> String {
    let mut numeral = match quality {
        "minor" | "diminished" => base.to_ascii_lowercase(),
        _ => base.to_string(),
    };
    match quality {
        "diminished" => numeral.push('°'),
        "augmented" => numeral.push('+'),
        _ => {}
    }
    match suffix {
        "7" | "m7" => numeral.push('7'),
        "maj7" => numeral.push_str("maj7"),
        "dim7" => numeral.push('7'),
        "m7b5" => numeral.push('7'),
        "9" | "m9" => numeral.push('9'),
        _ => {}
    }
    numeral
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSuggestion {
    pub numeral: String,
    pub probability: f64,
}

type TransitionRow = (&'static str, &'static [(&'static str, f64)]);

static POP_TRANSITIONS: &[TransitionRow] = &[
    ("I", &[("V", 0.3), ("vi", 0.25), ("IV", 0.25), ("ii", 0.15)]),
    ("ii", &[("V", 0.5), ("IV", 0.2), ("vi", 0.15)]),
    ("iii", &[("vi", 0.4), ("IV", 0.3), ("ii", 0.15)]),
    ("IV", &[("I", 0.35), ("V", 0.35), ("vi", 0.15)]),
    ("V", &[("I", 0.4), ("vi", 0.35), ("IV", 0.15)]),
    ("vi", &[("IV", 0.4), ("V", 0.25), ("ii", 0.2)]),
];

static JAZZ_TRANSITIONS: &[TransitionRow] = &[
    ("I", &[("ii", 0.3), ("vi", 0.25), ("iii", 0.15), ("IV", 0.15)]),
    ("ii", &[("V", 0.6), ("vii°", 0.1), ("iii", 0.1)]),
    ("iii", &[("vi", 0.45), ("ii", 0.2), ("IV", 0.15)]),
    ("IV", &[("ii", 0.3), ("V", 0.3), ("iii", 0.2)]),
    ("V", &[("I", 0.55), ("vi", 0.2), ("iii", 0.1)]),
    ("vi", &[("ii", 0.5), ("V", 0.2), ("IV", 0.15)]),
];

static CLASSICAL_TRANSITIONS: &[TransitionRow] = &[
    ("I", &[("V", 0.3), ("IV", 0.25), ("ii", 0.15), ("vi", 0.15)]),
    ("ii", &[("V", 0.55), ("vii°", 0.15), ("IV", 0.1)]),
    ("iii", &[("vi", 0.4), ("IV", 0.3), ("ii", 0.1)]),
    ("IV", &[("V", 0.45), ("I", 0.25), ("ii", 0.15)]),
    ("V", &[("I", 0.6), ("vi", 0.25), ("IV", 0.05)]),
    ("vi", &[("ii", 0.3), ("IV", 0.3), ("V", 0.2)]),
    ("vii°", &[("I", 0.7), ("iii", 0.1)]),
];

/// Two-chord patterns with a strong expected continuation.
static LOOKBACK_PATTERNS: &[(&str, &str, &str, f64)] = &[
    ("ii", "V", "I", 0.8),
    ("IV", "V", "I", 0.7),
    ("IV", "V", "vi", 0.2),
    ("I", "V", "vi", 0.4),
    ("vi", "IV", "I", 0.4),
];

/// Suggest likely next chords for a roman-numeral progression.
///
/// Style-specific first-order transition tables, boosted by two-chord
/// look-back patterns. Top 5 by probability.
pub fn suggest_next_chord(numerals: &[&str], _key: &str, style: &str) -> Vec<ChordSuggestion> {
    let Some(&last) = numerals.last() else {
        return vec![ChordSuggestion {
            numeral: "I".into(),
            probability: 1.0,
        }];
    };

    let table = match style {
        "jazz" => JAZZ_TRANSITIONS,
        "pop" => POP_TRANSITIONS,
        _ => CLASSICAL_TRANSITIONS,
    };

    let mut weighted: Vec<(String, f64)> = table
        .iter()
        .find(|(from, _)| *from == last)
        .map(|(_, row)| row.iter().map(|&(n, p)| (n.to_string(), p)).collect())
        .unwrap_or_default();

    if numerals.len() >= 2 {
        let prev = numerals[numerals.len() - 2];
        for &(a, b, next, p) in LOOKBACK_PATTERNS {
            if a == prev && b == last {
                match weighted.iter_mut().find(|(n, _)| n == next) {
                    Some(entry) => entry.1 = entry.1.max(p),
                    None => weighted.push((next.to_string(), p)),
                }
            }
        }
    }

    weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
    weighted.truncate(5);
    weighted
        .into_iter()
        .map(|(numeral, probability)| ChordSuggestion {
            numeral,
            probability,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionScore {
    pub score: f64,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

/// Progression pairs that tend to sound aimless.
static WEAK_PAIRS: &[(&str, &str)] = &[
    ("ii", "iii"),
    ("iii", "ii"),
    ("iii", "I"),
    ("I", "vii°"),
    ("vii°", "vi"),
];

/// Root motion by step in the same direction invites parallel motion.
static PARALLEL_RISK_PAIRS: &[(&str, &str)] = &[
    ("I", "ii"),
    ("ii", "iii"),
    ("IV", "V"),
    ("V", "vi"),
    ("vi", "vii°"),
];

/// Score a roman-numeral progression.
///
/// Starts from 100 and subtracts fixed penalties for weak pairs, parallel
/// motion risk, and a missing authentic cadence in longer progressions.
/// Valid above 60.
pub fn validate_progression(numerals: &[&str], _key: &str) -> ProgressionScore {
    let mut score = 100.0_f64;
    let mut issues = Vec::new();

    for pair in numerals.windows(2) {
        if WEAK_PAIRS.contains(&(pair[0], pair[1])) {
            score -= 10.0;
            issues.push(format!("weak motion {} to {}", pair[0], pair[1]));
        }
        if PARALLEL_RISK_PAIRS.contains(&(pair[0], pair[1])) {
            score -= 5.0;
            issues.push(format!(
                "stepwise root motion {} to {} risks parallels",
                pair[0], pair[1]
            ));
        }
    }

    let has_authentic = numerals
        .windows(2)
        .any(|pair| (pair[0] == "V" || pair[0] == "V7") && (pair[1] == "I" || pair[1] == "i"));
    if numerals.len() > 3 && !has_authentic {
        score -= 5.0;
        issues.push("no authentic cadence".into());
    }

    let score = score.max(0.0);
    ProgressionScore {
        score,
        is_valid: score > 60.0,
        issues,
    }
}
