//! Composition scoring: independent 0-1 category scores with recorded
//! issues, an unweighted overall mean, and keyword-matched suggestions.
//! Low scores are data for the caller, never errors.

use std::collections::BTreeSet;

use crate::types::{CompleteComposition, QualityReport, SectionType};

fn melody_score(c: &CompleteComposition, issues: &mut Vec<String>) -> f64 {
    let notes = &c.melody.notes;
    if notes.len() < 2 {
        issues.push("melody has too few notes to evaluate".to_string());
        return 0.0;
    }

    let max = *notes.iter().max().unwrap_or(&0) as i16;
    let min = *notes.iter().min().unwrap_or(&0) as i16;
    let range = max - min;
    let range_score = if (12..=24).contains(&range) {
        1.0
    } else if range < 12 {
        range as f64 / 12.0
    } else {
        (36.0 - range as f64).max(0.0) / 12.0
    };
    if range < 7 {
        issues.push("melodic range is narrow".to_string());
    }

    let moves = notes.len() - 1;
    let mut leaps = 0usize;
    let mut up = 0usize;
    let mut down = 0usize;
    for pair in notes.windows(2) {
        let diff = pair[1] as i16 - pair[0] as i16;
        if diff.abs() > 4 {
            leaps += 1;
        }
        if diff > 0 {
            up += 1;
        } else if diff < 0 {
            down += 1;
        }
    }
    let leap_ratio = leaps as f64 / moves as f64;
    let leap_score = (1.0 - leap_ratio / 0.5).clamp(0.0, 1.0);
    if leap_ratio > 0.4 {
        issues.push("melody has too many leaps".to_string());
    }

    let directed = up + down;
    let balance = if directed == 0 {
        0.5
    } else {
        up.min(down) as f64 / directed as f64 * 2.0
    };
    if directed > 0 && up.max(down) as f64 / directed as f64 > 0.8 {
        issues.push("melodic direction is monotonous".to_string());
    }

    (range_score + leap_score + balance) / 3.0
}

fn harmony_score(c: &CompleteComposition, issues: &mut Vec<String>) -> f64 {
    let n = c.harmony.len();
    if n == 0 {
        issues.push("progression is empty".to_string());
        return 0.0;
    }
    let length_score = (n as f64 / 4.0).min(1.0);
    if n < 3 {
        issues.push("progression is too short".to_string());
    }

    let unique_roots: BTreeSet<u8> = c
        .harmony
        .chords
        .iter()
        .map(|chord| chord.root.pitch_class())
        .collect();
    let variety = unique_roots.len() as f64 / n.min(6) as f64;
    if variety < 0.3 {
        issues.push("progression lacks chord variety".to_string());
    }

    (length_score + variety.min(1.0)) / 2.0
}

fn rhythm_score(c: &CompleteComposition, issues: &mut Vec<String>) -> f64 {
    let rhythm = &c.melody.rhythm;
    if rhythm.is_empty() {
        issues.push("melody has no rhythm".to_string());
        return 0.0;
    }

    let mut distinct: Vec<f64> = Vec::new();
    for &d in rhythm {
        if !distinct.iter().any(|&x| (x - d).abs() < 1e-9) {
            distinct.push(d);
        }
    }
    let variety_score = (distinct.len() as f64 / 3.0).min(1.0);
    if distinct.len() == 1 {
        issues.push("rhythm is uniform".to_string());
    }

    let extreme = rhythm
        .iter()
        .filter(|&&d| !(0.25..=4.0).contains(&d))
        .count();
    let extreme_ratio = extreme as f64 / rhythm.len() as f64;
    if extreme_ratio > 0.2 {
        issues.push("rhythm has extreme note durations".to_string());
    }

    (variety_score + (1.0 - extreme_ratio)) / 2.0
}

fn form_score(c: &CompleteComposition, issues: &mut Vec<String>) -> f64 {
    let sections = &c.structure.sections;
    if sections.is_empty() {
        issues.push("structure has no sections".to_string());
        return 0.0;
    }

    let has_verse = sections
        .iter()
        .any(|s| s.section_type == SectionType::Verse);
    let has_chorus = sections
        .iter()
        .any(|s| s.section_type == SectionType::Chorus);
    let presence = match (has_verse, has_chorus) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.7,
        (false, false) => {
            issues.push("structure is missing core sections".to_string());
            0.4
        }
    };

    let total = c.structure.total_duration;
    let duration_ok = (30.0..=600.0).contains(&total);
    if !duration_ok {
        issues.push("total duration is outside a song-length range".to_string());
    }

    (presence + if duration_ok { 1.0 } else { 0.5 }) / 2.0
}

fn arrangement_score(c: &CompleteComposition, issues: &mut Vec<String>) -> f64 {
    let parts = &c.arrangement.parts;
    if parts.is_empty() {
        issues.push("arrangement has no parts".to_string());
        return 0.0;
    }

    let count_score = (parts.len() as f64 / 3.0).min(1.0);
    let filled = parts.values().filter(|p| !p.notes.is_empty()).count();
    let completeness = filled as f64 / parts.len() as f64;
    if filled < parts.len() {
        issues.push("arrangement has empty parts".to_string());
    }

    (count_score + completeness) / 2.0
}

/// (issue keyword, suggestion) pairs; a suggestion fires when any issue
/// contains its keyword.
static SUGGESTIONS: &[(&str, &str)] = &[
    ("narrow", "widen the melodic range with an octave leap or a phrase climax"),
    ("leaps", "smooth large leaps with passing tones"),
    ("monotonous", "balance ascending and descending motion"),
    ("short", "extend the progression with a pre-cadential ii or IV"),
    ("variety", "substitute a secondary dominant or a borrowed chord"),
    ("uniform", "vary note durations with dotted rhythms or syncopation"),
    ("extreme", "keep durations between a sixteenth and a whole note"),
    ("sections", "add contrasting verse and chorus sections"),
    ("duration", "rescale the structure toward a 2-5 minute song"),
    ("empty", "give every instrument material or drop it from the ensemble"),
];

/// Score a composition across melody, harmony, rhythm, form, and
/// arrangement; overall is the unweighted mean.
pub fn analyze_quality(c: &CompleteComposition) -> QualityReport {
    let mut issues = Vec::new();
    let melody = melody_score(c, &mut issues);
    let harmony = harmony_score(c, &mut issues);
    let rhythm = rhythm_score(c, &mut issues);
    let form = form_score(c, &mut issues);
    let arrangement = arrangement_score(c, &mut issues);
    let overall = (melody + harmony + rhythm + form + arrangement) / 5.0;

    let mut suggestions = Vec::new();
    for (keyword, suggestion) in SUGGESTIONS {
        if issues.iter().any(|issue| issue.contains(keyword)) {
            suggestions.push((*suggestion).to_string());
        }
    }

    QualityReport {
        melody,
        harmony,
        rhythm,
        form,
        arrangement,
        overall,
        issues,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use music_theory::chord::Voicing;
    use music_theory::progression::create_progression;

    use crate::types::{
        Arrangement, DynamicLevel, InstrumentPart, InstrumentRole, Melody, Register, Section,
        SongStructure,
    };

    use super::*;

    fn composition() -> CompleteComposition {
        let harmony = create_progression("C", &["I", "IV", "V", "I"], 4.0, Voicing::Close);
        let melody = Melody {
            notes: vec![72, 74, 76, 77, 79, 77, 76, 74, 72, 76, 79, 84],
            rhythm: vec![1.0, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0, 1.0, 2.0],
            register: Register::Mid,
            sources: vec![crate::types::NoteSource::ChordTone; 12],
        };
        let sections = vec![
            Section {
                section_type: SectionType::Verse,
                key: "C".into(),
                duration: 60.0,
                measures: 30,
                energy: 0.5,
                texture: None,
            },
            Section {
                section_type: SectionType::Chorus,
                key: "C".into(),
                duration: 60.0,
                measures: 30,
                energy: 0.75,
                texture: None,
            },
        ];
        let mut parts = BTreeMap::new();
        for name in ["piano", "bass", "drums"] {
            parts.insert(
                name.to_string(),
                InstrumentPart {
                    instrument: name.to_string(),
                    role: InstrumentRole::Harmony,
                    notes: vec![60, 62],
                    rhythm: vec![1.0, 1.0],
                    register: Register::Mid,
                    dynamics: vec![DynamicLevel::Mf; 2],
                    articulation: "sustained".into(),
                },
            );
        }
        let structure = SongStructure {
            genre: "pop".into(),
            sections,
            key_plan: vec!["C".into(), "C".into()],
            tempo: 120,
            time_signature: (4, 4),
            total_duration: 120.0,
        };
        CompleteComposition {
            title: "Test".into(),
            genre: "pop".into(),
            key: "C".into(),
            tempo: 120,
            time_signature: (4, 4),
            structure,
            melody,
            harmony,
            arrangement: Arrangement {
                ensemble: "rock_band".into(),
                style: "pop".into(),
                parts,
                mix_balance: BTreeMap::new(),
            },
            quality: QualityReport {
                melody: 0.0,
                harmony: 0.0,
                rhythm: 0.0,
                form: 0.0,
                arrangement: 0.0,
                overall: 0.0,
                issues: vec![],
                suggestions: vec![],
            },
        }
    }

    #[test]
    fn balanced_composition_scores_well() {
        let report = analyze_quality(&composition());
        assert!(report.overall > 0.7, "overall {}", report.overall);
        assert!(report.melody > 0.5);
        assert!(report.harmony > 0.5);
        assert!(report.form > 0.9);
        assert!(report.arrangement > 0.9);
    }

    #[test]
    fn overall_is_the_unweighted_mean() {
        let report = analyze_quality(&composition());
        let mean = (report.melody + report.harmony + report.rhythm + report.form
            + report.arrangement)
            / 5.0;
        assert!((report.overall - mean).abs() < 1e-12);
    }

    #[test]
    fn narrow_melody_is_flagged_with_a_suggestion() {
        let mut c = composition();
        c.melody.notes = vec![60, 61, 60, 62, 60, 61];
        let report = analyze_quality(&c);
        assert!(report.issues.iter().any(|i| i.contains("narrow")));
        assert!(report
            .suggestions
            .iter()
            .any(|s| s.contains("widen the melodic range")));
    }

    #[test]
    fn uniform_rhythm_is_flagged() {
        let mut c = composition();
        c.melody.rhythm = vec![1.0; c.melody.notes.len()];
        let report = analyze_quality(&c);
        assert!(report.issues.iter().any(|i| i.contains("uniform")));
    }

    #[test]
    fn empty_parts_lower_the_arrangement_score() {
        let mut c = composition();
        if let Some(part) = c.arrangement.parts.get_mut("drums") {
            part.notes.clear();
        }
        let report = analyze_quality(&c);
        assert!(report.arrangement < 1.0);
        assert!(report.issues.iter().any(|i| i.contains("empty")));
    }
}
