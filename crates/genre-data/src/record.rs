use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named roman-numeral progression and its bar span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionPattern {
    pub pattern: Vec<String>,
    pub bars: u32,
}

impl ProgressionPattern {
    pub fn new(numerals: &[&str], bars: u32) -> Self {
        ProgressionPattern {
            pattern: numerals.iter().map(|s| s.to_string()).collect(),
            bars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmSpec {
    /// "straight", "swing", "shuffle", "syncopated".
    pub feel: String,
    /// Beats (1-based) that carry the accent.
    pub emphasis: Vec<u8>,
    /// Subdivisions per beat.
    pub subdivision: u8,
}

impl RhythmSpec {
    pub fn straight() -> Self {
        RhythmSpec {
            feel: "straight".into(),
            emphasis: vec![1, 3],
            subdivision: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Instrumentation {
    pub essential: Vec<String>,
    pub typical: Vec<String>,
    pub optional: Vec<String>,
}

impl Instrumentation {
    pub fn new(essential: &[&str], typical: &[&str], optional: &[&str]) -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Instrumentation {
            essential: owned(essential),
            typical: owned(typical),
            optional: owned(optional),
        }
    }

    pub fn all(&self) -> Vec<&str> {
        self.essential
            .iter()
            .chain(self.typical.iter())
            .chain(self.optional.iter())
            .map(|s| s.as_str())
            .collect()
    }
}

/// Everything the generators know about one genre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRecord {
    pub name: String,
    /// [min, max] BPM.
    pub tempo_range: [u32; 2],
    pub progressions: BTreeMap<String, ProgressionPattern>,
    pub rhythms: BTreeMap<String, RhythmSpec>,
    /// Scale type names the genre favors, most characteristic first.
    pub scales: Vec<String>,
    pub instrumentation: Instrumentation,
    /// Free-form descriptors ("energy", "swing_amount", ...).
    pub characteristics: BTreeMap<String, String>,
}

impl GenreRecord {
    /// Synthesize a serviceable default for a genre with no stored data.
    pub fn default_for(name: &str) -> GenreRecord {
        let mut progressions = BTreeMap::new();
        progressions.insert(
            "standard".to_string(),
            ProgressionPattern::new(&["I", "V", "vi", "IV"], 4),
        );

        let mut rhythms = BTreeMap::new();
        rhythms.insert("basic".to_string(), RhythmSpec::straight());

        let mut characteristics = BTreeMap::new();
        characteristics.insert("energy".to_string(), "0.5".to_string());

        GenreRecord {
            name: name.to_string(),
            tempo_range: [80, 140],
            progressions,
            rhythms,
            scales: vec!["major".into(), "natural_minor".into()],
            instrumentation: Instrumentation::new(
                &["piano", "bass", "drums"],
                &["guitar"],
                &["strings"],
            ),
            characteristics,
        }
    }

    /// Midpoint of the tempo range.
    pub fn typical_tempo(&self) -> u32 {
        (self.tempo_range[0] + self.tempo_range[1]) / 2
    }

    /// Base energy 0-1 from characteristics, defaulting to 0.5.
    pub fn base_energy(&self) -> f64 {
        self.characteristics
            .get("energy")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.5)
    }

    pub fn progression(&self, name: &str) -> Option<&ProgressionPattern> {
        self.progressions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn synthesized_default_is_complete() {
        let record = GenreRecord::default_for("shoegaze");
        assert_eq!(record.name, "shoegaze");
        assert!(record.tempo_range[0] < record.tempo_range[1]);
        assert!(record.progressions.contains_key("standard"));
        assert!(!record.scales.is_empty());
        assert!(!record.instrumentation.essential.is_empty());
    }

    #[test]
    fn default_energy_parses() {
        let record = GenreRecord::default_for("anything");
        assert_eq!(record.base_energy(), 0.5);
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = GenreRecord::default_for("pop");
        let json = serde_json::to_string(&record).unwrap();
        let back: GenreRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
