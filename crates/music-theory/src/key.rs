use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TheoryError;
use crate::note::{note_name, pitch_class_of, FLAT_KEY_ROOTS};

/// Krumhansl-Kessler major key profile (duration-weighted perception studies).
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler minor key profile.
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    Major,
    Minor,
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMode::Major => write!(f, "major"),
            KeyMode::Minor => write!(f, "minor"),
        }
    }
}

/// Parse a key name ("C", "Am", "Eb minor") into pitch class and mode.
pub fn parse_key(key: &str) -> Result<(u8, KeyMode), TheoryError> {
    let trimmed = key.trim();
    let pc = pitch_class_of(trimmed).ok_or_else(|| TheoryError::UnknownKey(key.to_string()))?;

    let rest_start = if trimmed.len() > 1 && matches!(trimmed.as_bytes()[1], b'#' | b'b') {
        2
    } else {
        1
    };
    let rest = trimmed[rest_start..].trim().to_ascii_lowercase();
    let mode = if rest == "m" || rest.starts_with("min") {
        KeyMode::Minor
    } else {
        KeyMode::Major
    };
    Ok((pc, mode))
}

/// Format a key as its compact name: "C", "Am", "Eb".
pub fn key_name(pc: u8, mode: KeyMode) -> String {
    let use_flats = FLAT_KEY_ROOTS.contains(&(pc % 12));
    let suffix = match mode {
        KeyMode::Minor => "m",
        KeyMode::Major => "",
    };
    format!("{}{}", note_name(pc, use_flats), suffix)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyCandidate {
    pub key: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyChange {
    /// Timestamp (caller's unit, usually beats) where the change surfaced.
    pub timestamp: f64,
    pub key: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAnalysis {
    pub most_likely_key: String,
    /// Best profile correlation rescaled from [-1,1] to [0,1].
    pub confidence: f64,
    /// Next-best candidates, best first.
    pub alternative_keys: Vec<KeyCandidate>,
    /// Detected changes when timestamps were provided.
    pub key_changes: Vec<KeyChange>,
}

/// Correlate a pitch-class histogram against all 24 key profiles.
///
/// Returns (pitch class, mode, correlation) triples sorted best first.
fn rank_keys(histogram: &[f64; 12]) -> Vec<(u8, KeyMode, f64)> {
    let mut ranked = Vec::with_capacity(24);
    for root in 0..12u8 {
        let mut rotated = [0.0; 12];
        for (i, slot) in rotated.iter_mut().enumerate() {
            *slot = histogram[(i + root as usize) % 12];
        }
        ranked.push((root, KeyMode::Major, pearson(&rotated, &MAJOR_PROFILE)));
        ranked.push((root, KeyMode::Minor, pearson(&rotated, &MINOR_PROFILE)));
    }
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2));
    ranked
}

fn histogram_of(midi_notes: &[u8]) -> [f64; 12] {
    let mut histogram = [0.0_f64; 12];
    for &note in midi_notes {
        histogram[(note % 12) as usize] += 1.0;
    }
    let total: f64 = histogram.iter().sum();
    if total > 0.0 {
        for h in &mut histogram {
            *h /= total;
        }
    }
    histogram
}

/// Detect the key of a note set using the Krumhansl-Schmuckler algorithm.
///
/// When `timestamps` are supplied (parallel to `midi_notes`), a sliding
/// window (size 15, step 5) re-detects locally and reports a key change
/// whenever a window disagrees with the running key at confidence > 0.75.
pub fn detect_key(midi_notes: &[u8], timestamps: Option<&[f64]>) -> KeyAnalysis {
    if midi_notes.is_empty() {
        return KeyAnalysis {
            most_likely_key: "C".into(),
            confidence: 0.0,
            alternative_keys: Vec::new(),
            key_changes: Vec::new(),
        };
    }

    let ranked = rank_keys(&histogram_of(midi_notes));
    let (best_pc, best_mode, best_corr) = ranked[0];

    let alternative_keys = ranked[1..6.min(ranked.len())]
        .iter()
        .map(|&(pc, mode, corr)| KeyCandidate {
            key: key_name(pc, mode),
            confidence: (corr + 1.0) / 2.0,
        })
        .collect();

    let mut key_changes = Vec::new();
    if let Some(times) = timestamps {
        if times.len() == midi_notes.len() && midi_notes.len() > 15 {
            let mut running = key_name(best_pc, best_mode);
            let mut start = 0;
            while start + 15 <= midi_notes.len() {
                let window = &midi_notes[start..start + 15];
                let local = rank_keys(&histogram_of(window));
                let (pc, mode, corr) = local[0];
                let local_key = key_name(pc, mode);
                let local_conf = (corr + 1.0) / 2.0;
                if local_key != running && local_conf > 0.75 {
                    debug!(from = %running, to = %local_key, "windowed key change");
                    key_changes.push(KeyChange {
                        timestamp: times[start],
                        key: local_key.clone(),
                        confidence: local_conf,
                    });
                    running = local_key;
                }
                start += 5;
            }
        }
    }

    KeyAnalysis {
        most_likely_key: key_name(best_pc, best_mode),
        confidence: (best_corr + 1.0) / 2.0,
        alternative_keys,
        key_changes,
    }
}

/// Pearson correlation coefficient between two 12-element arrays.
fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let x_mean: f64 = x.iter().sum::<f64>() / 12.0;
    let y_mean: f64 = y.iter().sum::<f64>() / 12.0;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;

    for i in 0..12 {
        let xd = x[i] - x_mean;
        let yd = y[i] - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    num / denom
}

/// Distance between two pitch classes on the circle of fifths, 0-6.
pub fn circle_of_fifths_distance(a_pc: u8, b_pc: u8) -> u8 {
    // Position on the circle: multiply by 7 (a fifth) mod 12
    let pos_a = (a_pc as i32 * 7).rem_euclid(12);
    let pos_b = (b_pc as i32 * 7).rem_euclid(12);
    let diff = (pos_a - pos_b).rem_euclid(12);
    diff.min(12 - diff) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRelationship {
    Identical,
    Relative,
    Parallel,
    CloselyRelated,
    ChromaticMediant,
    Distant,
}

/// Classify how two keys relate.
pub fn classify_relationship(
    from_pc: u8,
    from_mode: KeyMode,
    to_pc: u8,
    to_mode: KeyMode,
) -> KeyRelationship {
    if from_pc == to_pc && from_mode == to_mode {
        return KeyRelationship::Identical;
    }
    if from_pc == to_pc {
        return KeyRelationship::Parallel;
    }
    let relative = match from_mode {
        KeyMode::Major => (from_pc + 9) % 12,
        KeyMode::Minor => (from_pc + 3) % 12,
    };
    if to_pc == relative && to_mode != from_mode {
        return KeyRelationship::Relative;
    }
    if circle_of_fifths_distance(from_pc, to_pc) <= 2 {
        return KeyRelationship::CloselyRelated;
    }
    let root_interval = (to_pc as i32 - from_pc as i32).rem_euclid(12);
    if from_mode == to_mode && matches!(root_interval, 3 | 4 | 8 | 9) {
        return KeyRelationship::ChromaticMediant;
    }
    KeyRelationship::Distant
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modulation {
    pub from_key: String,
    pub to_key: String,
    /// Note index where the new key took over.
    pub position: usize,
    pub relationship: KeyRelationship,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationAnalysis {
    pub home_key: String,
    pub modulations: Vec<Modulation>,
}

/// Locate modulations with an overlapping-window key scan.
///
/// Windows of 20 notes at 50% overlap; a modulation is declared when a
/// window's best key differs from the current key at confidence > 0.7.
pub fn analyze_modulations(midi_notes: &[u8]) -> ModulationAnalysis {
    let overall = detect_key(midi_notes, None);
    let home_key = overall.most_likely_key.clone();

    let mut modulations = Vec::new();
    if midi_notes.len() >= 20 {
        let mut current = home_key.clone();
        let mut start = 0;
        while start + 20 <= midi_notes.len() {
            let window = &midi_notes[start..start + 20];
            let local = rank_keys(&histogram_of(window));
            let (pc, mode, corr) = local[0];
            let local_key = key_name(pc, mode);
            let confidence = (corr + 1.0) / 2.0;

            if local_key != current && confidence > 0.7 {
                let (from_pc, from_mode) =
                    parse_key(&current).unwrap_or((0, KeyMode::Major));
                let relationship = classify_relationship(from_pc, from_mode, pc, mode);
                modulations.push(Modulation {
                    from_key: current.clone(),
                    to_key: local_key.clone(),
                    position: start,
                    relationship,
                    confidence,
                });
                current = local_key;
            }
            start += 10;
        }
    }

    ModulationAnalysis {
        home_key,
        modulations,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationPlan {
    pub from_key: String,
    pub to_key: String,
    pub relationship: KeyRelationship,
    /// "closely related" / "moderate" / "distant" by circle-of-fifths distance.
    pub difficulty: String,
    /// Chords diatonic to both keys, usable as pivots.
    pub pivot_chords: Vec<String>,
    /// Note names shared by both key scales.
    pub common_tones: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Diatonic triad symbols for a key ("C" → ["C","Dm","Em","F","G","Am","Bdim"]).
pub fn diatonic_triads(pc: u8, mode: KeyMode) -> Vec<String> {
    let use_flats = FLAT_KEY_ROOTS.contains(&pc);
    let (offsets, qualities): (&[u8], &[&str]) = match mode {
        KeyMode::Major => (
            &[0, 2, 4, 5, 7, 9, 11],
            &["", "m", "m", "", "", "m", "dim"],
        ),
        KeyMode::Minor => (
            &[0, 2, 3, 5, 7, 8, 10],
            &["m", "dim", "", "m", "m", "", ""],
        ),
    };
    offsets
        .iter()
        .zip(qualities.iter())
        .map(|(&off, &q)| format!("{}{}", note_name((pc + off) % 12, use_flats), q))
        .collect()
}

fn scale_note_names(pc: u8, mode: KeyMode) -> Vec<String> {
    let use_flats = FLAT_KEY_ROOTS.contains(&pc);
    let offsets: &[u8] = match mode {
        KeyMode::Major => &[0, 2, 4, 5, 7, 9, 11],
        KeyMode::Minor => &[0, 2, 3, 5, 7, 8, 10],
    };
    offsets
        .iter()
        .map(|&off| note_name((pc + off) % 12, use_flats).to_string())
        .collect()
}

/// Plan a modulation from one key to another.
pub fn suggest_modulation(from_key: &str, to_key: &str) -> Result<ModulationPlan, TheoryError> {
    let (from_pc, from_mode) = parse_key(from_key)?;
    let (to_pc, to_mode) = parse_key(to_key)?;

    let relationship = classify_relationship(from_pc, from_mode, to_pc, to_mode);
    let fifths = circle_of_fifths_distance(from_pc, to_pc);
    let difficulty = if fifths <= 1 {
        "closely related"
    } else if fifths <= 3 {
        "moderate"
    } else {
        "distant"
    };

    let from_triads = diatonic_triads(from_pc, from_mode);
    let to_triads = diatonic_triads(to_pc, to_mode);
    let pivot_chords: Vec<String> = from_triads
        .iter()
        .filter(|t| to_triads.contains(t))
        .cloned()
        .collect();

    let from_tones = scale_note_names(from_pc, from_mode);
    let to_tones = scale_note_names(to_pc, to_mode);
    let common_tones: Vec<String> = from_tones
        .iter()
        .filter(|t| to_tones.contains(t))
        .cloned()
        .collect();

    let mut suggestions = Vec::new();
    if !pivot_chords.is_empty() {
        suggestions.push(format!(
            "pivot through a chord shared by both keys: {}",
            pivot_chords.join(", ")
        ));
    }
    let dominant = note_name((to_pc + 7) % 12, FLAT_KEY_ROOTS.contains(&to_pc));
    suggestions.push(format!(
        "approach {} through its secondary dominant {}7",
        to_key, dominant
    ));

    Ok(ModulationPlan {
        from_key: from_key.to_string(),
        to_key: to_key.to_string(),
        relationship,
        difficulty: difficulty.to_string(),
        pivot_chords,
        common_tones,
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn c_major_scale_detected() {
        let notes: Vec<u8> = [60, 62, 64, 65, 67, 69, 71]
            .iter()
            .cycle()
            .take(21)
            .copied()
            .collect();
        let analysis = detect_key(&notes, None);
        assert_eq!(analysis.most_likely_key, "C");
        assert!(analysis.confidence > 0.7, "confidence {}", analysis.confidence);
        assert_eq!(analysis.alternative_keys.len(), 5);
    }

    #[test]
    fn empty_notes_degrade_gracefully() {
        let analysis = detect_key(&[], None);
        assert_eq!(analysis.most_likely_key, "C");
        assert_eq!(analysis.confidence, 0.0);
    }

    #[test]
    fn timestamped_notes_surface_key_changes() {
        // 25 notes of C major, then 25 of F# major
        let mut notes: Vec<u8> = Vec::new();
        for i in 0..25 {
            notes.push([60, 62, 64, 65, 67, 69, 71][i % 7]);
        }
        for i in 0..25 {
            notes.push([66, 68, 70, 71, 73, 75, 77][i % 7]);
        }
        let times: Vec<f64> = (0..notes.len()).map(|i| i as f64 * 0.5).collect();
        let analysis = detect_key(&notes, Some(&times));
        assert!(
            analysis.key_changes.iter().any(|c| c.key == "Gb" || c.key == "F#" || c.key == "Ebm"),
            "expected a change into the second key, got {:?}",
            analysis.key_changes
        );
    }

    #[test]
    fn fifths_distance() {
        assert_eq!(circle_of_fifths_distance(0, 7), 1); // C-G
        assert_eq!(circle_of_fifths_distance(0, 2), 2); // C-D
        assert_eq!(circle_of_fifths_distance(0, 6), 6); // C-F#
        assert_eq!(circle_of_fifths_distance(0, 0), 0);
    }

    #[test]
    fn relationship_classification() {
        // C major / A minor: relative
        assert_eq!(
            classify_relationship(0, KeyMode::Major, 9, KeyMode::Minor),
            KeyRelationship::Relative
        );
        // C major / C minor: parallel
        assert_eq!(
            classify_relationship(0, KeyMode::Major, 0, KeyMode::Minor),
            KeyRelationship::Parallel
        );
        // C major / G major: closely related
        assert_eq!(
            classify_relationship(0, KeyMode::Major, 7, KeyMode::Major),
            KeyRelationship::CloselyRelated
        );
        // C major / E major: chromatic mediant
        assert_eq!(
            classify_relationship(0, KeyMode::Major, 4, KeyMode::Major),
            KeyRelationship::ChromaticMediant
        );
        // C major / F# major: distant
        assert_eq!(
            classify_relationship(0, KeyMode::Major, 6, KeyMode::Major),
            KeyRelationship::Distant
        );
    }

    #[test]
    fn modulation_plan_c_to_g() {
        let plan = suggest_modulation("C", "G").unwrap();
        assert_eq!(plan.difficulty, "closely related");
        // C, Em, G and Am are diatonic to both C and G major
        assert!(plan.pivot_chords.contains(&"C".to_string()));
        assert!(plan.pivot_chords.contains(&"Am".to_string()));
        // D7 is the secondary dominant of G
        assert!(plan.suggestions.iter().any(|s| s.contains("D7")));
        assert_eq!(plan.common_tones.len(), 6); // all of C major except F
    }

    #[test]
    fn key_parsing() {
        assert_eq!(parse_key("C").unwrap(), (0, KeyMode::Major));
        assert_eq!(parse_key("Am").unwrap(), (9, KeyMode::Minor));
        assert_eq!(parse_key("Eb minor").unwrap(), (3, KeyMode::Minor));
        assert_eq!(parse_key("F# major").unwrap(), (6, KeyMode::Major));
        assert!(parse_key("X").is_err());
    }

    #[test]
    fn modulation_scan_finds_distant_shift() {
        let mut notes: Vec<u8> = Vec::new();
        for i in 0..30 {
            notes.push([60, 62, 64, 65, 67, 69, 71][i % 7]);
        }
        for i in 0..30 {
            notes.push([66, 68, 70, 71, 73, 75, 77][i % 7]);
        }
        let analysis = analyze_modulations(&notes);
        assert!(
            !analysis.modulations.is_empty(),
            "expected at least one modulation"
        );
    }
}
