use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use music_theory::progression::ChordProgression;

/// Rough pitch band a line lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Register {
    Low,
    Mid,
    High,
}

/// Where a melody note came from, recorded for later analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSource {
    ChordTone,
    ScaleTone,
    Chromatic,
}

/// A monophonic line: MIDI notes with parallel durations in beats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Melody {
    pub notes: Vec<u8>,
    /// Beats, parallel to `notes`.
    pub rhythm: Vec<f64>,
    pub register: Register,
    /// Parallel to `notes`.
    pub sources: Vec<NoteSource>,
}

impl Melody {
    /// Wrap bare notes as quarter-note scale tones in the mid register.
    pub fn from_notes(notes: Vec<u8>) -> Melody {
        let rhythm = vec![1.0; notes.len()];
        let sources = vec![NoteSource::ScaleTone; notes.len()];
        Melody {
            notes,
            rhythm,
            register: Register::Mid,
            sources,
        }
    }

    pub fn total_beats(&self) -> f64 {
        self.rhythm.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// A short melodic fragment subject to development.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motif {
    pub notes: Vec<u8>,
    /// Beats, parallel to `notes`.
    pub rhythm: Vec<f64>,
}

impl Motif {
    /// Quarter-note rhythm by default.
    pub fn new(notes: Vec<u8>) -> Motif {
        let rhythm = vec![1.0; notes.len()];
        Motif { notes, rhythm }
    }

    /// Consecutive semitone differences.
    pub fn intervallic_pattern(&self) -> Vec<i16> {
        self.notes
            .windows(2)
            .map(|w| w[1] as i16 - w[0] as i16)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Intro,
    Verse,
    Chorus,
    Bridge,
    Solo,
    Outro,
    Instrumental,
    Breakdown,
    Buildup,
}

impl SectionType {
    pub fn label(&self) -> &'static str {
        match self {
            SectionType::Intro => "intro",
            SectionType::Verse => "verse",
            SectionType::Chorus => "chorus",
            SectionType::Bridge => "bridge",
            SectionType::Solo => "solo",
            SectionType::Outro => "outro",
            SectionType::Instrumental => "instrumental",
            SectionType::Breakdown => "breakdown",
            SectionType::Buildup => "buildup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicLevel {
    Pp,
    P,
    Mp,
    Mf,
    F,
    Ff,
}

/// Texture decision attached to a section by the orchestration planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TexturePlan {
    pub dynamic: DynamicLevel,
    /// "thin", "medium", "thick", "very_thick".
    pub density: String,
    pub technique: String,
}

/// One span of a song's form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub section_type: SectionType,
    pub key: String,
    /// Seconds.
    pub duration: f64,
    pub measures: u32,
    /// 0-1.
    pub energy: f64,
    pub texture: Option<TexturePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongStructure {
    pub genre: String,
    pub sections: Vec<Section>,
    /// Key of each section, in order.
    pub key_plan: Vec<String>,
    pub tempo: u32,
    pub time_signature: (u8, u8),
    /// Seconds; equals the sum of section durations.
    pub total_duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentRole {
    Melody,
    Harmony,
    Bass,
    Accompaniment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPart {
    pub instrument: String,
    pub role: InstrumentRole,
    pub notes: Vec<u8>,
    /// Beats, parallel to `notes`.
    pub rhythm: Vec<f64>,
    pub register: Register,
    /// Parallel to `notes`.
    pub dynamics: Vec<DynamicLevel>,
    pub articulation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrangement {
    pub ensemble: String,
    pub style: String,
    pub parts: BTreeMap<String, InstrumentPart>,
    /// Relative level per instrument, 0-1.
    pub mix_balance: BTreeMap<String, f64>,
}

/// A one-bar drum grid at a fixed subdivision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatPattern {
    pub tempo: u32,
    pub steps_per_beat: u8,
    pub kick: Vec<bool>,
    pub snare: Vec<bool>,
    pub hihat: Vec<bool>,
    pub feel: String,
}

/// Independent 0-1 category scores with an unweighted mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub melody: f64,
    pub harmony: f64,
    pub rhythm: f64,
    pub form: f64,
    pub arrangement: f64,
    pub overall: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Everything the end-to-end pipeline produces for one song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteComposition {
    pub title: String,
    pub genre: String,
    pub key: String,
    pub tempo: u32,
    pub time_signature: (u8, u8),
    pub structure: SongStructure,
    pub melody: Melody,
    pub harmony: ChordProgression,
    pub arrangement: Arrangement,
    pub quality: QualityReport,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn melody_from_notes_defaults_to_quarter_notes() {
        let melody = Melody::from_notes(vec![60, 62, 64]);
        assert_eq!(melody.rhythm, vec![1.0, 1.0, 1.0]);
        assert_eq!(melody.total_beats(), 3.0);
        assert_eq!(melody.register, Register::Mid);
    }

    #[test]
    fn motif_intervallic_pattern_is_consecutive_differences() {
        let motif = Motif::new(vec![60, 64, 62]);
        assert_eq!(motif.intervallic_pattern(), vec![4, -2]);
    }
}
