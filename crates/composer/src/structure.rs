//! Song-structure generation: section templates per song type, scaled to a
//! target duration, with per-section energy levels derived from the genre.

use serde::{Deserialize, Serialize};
use tracing::debug;

use genre_data::GenreRecord;
use music_theory::key::{key_name, parse_key};

use crate::types::{Section, SectionType, SongStructure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongType {
    Standard,
    Ballad,
    Epic,
    Edm,
}

impl SongType {
    pub fn from_name(name: &str) -> SongType {
        match name.to_ascii_lowercase().as_str() {
            "ballad" => SongType::Ballad,
            "epic" => SongType::Epic,
            "edm" => SongType::Edm,
            _ => SongType::Standard,
        }
    }
}

/// Section templates as (type, share of total duration). Shares sum to 1.
fn template(song_type: SongType) -> &'static [(SectionType, f64)] {
    use SectionType::*;
    match song_type {
        SongType::Standard => &[
            (Intro, 0.06),
            (Verse, 0.18),
            (Chorus, 0.16),
            (Verse, 0.18),
            (Chorus, 0.16),
            (Bridge, 0.10),
            (Chorus, 0.16),
        ],
        SongType::Ballad => &[
            (Intro, 0.10),
            (Verse, 0.22),
            (Chorus, 0.18),
            (Verse, 0.22),
            (Chorus, 0.18),
            (Outro, 0.10),
        ],
        SongType::Epic => &[
            (Intro, 0.08),
            (Verse, 0.14),
            (Chorus, 0.12),
            (Verse, 0.14),
            (Chorus, 0.12),
            (Solo, 0.12),
            (Bridge, 0.10),
            (Chorus, 0.12),
            (Outro, 0.06),
        ],
        SongType::Edm => &[
            (Intro, 0.10),
            (Buildup, 0.15),
            (Chorus, 0.20),
            (Breakdown, 0.15),
            (Buildup, 0.10),
            (Chorus, 0.20),
            (Outro, 0.10),
        ],
    }
}

/// Added to the genre's base energy, result clamped to [0, 1].
fn energy_modifier(section_type: SectionType) -> f64 {
    match section_type {
        SectionType::Intro => -0.2,
        SectionType::Verse => 0.0,
        SectionType::Chorus => 0.25,
        SectionType::Bridge => 0.1,
        SectionType::Solo => 0.2,
        SectionType::Outro => -0.25,
        SectionType::Instrumental => 0.05,
        SectionType::Breakdown => -0.3,
        SectionType::Buildup => 0.15,
    }
}

/// Build a song structure for a genre: a section sequence from the song
/// type's template (electronic defaults to the EDM shape), absolute
/// durations scaled to `target_duration` seconds, measure counts from the
/// genre's typical tempo in 4/4, and a key plan that keeps the tonic
/// everywhere except a subdominant bridge.
pub fn create_structure(
    record: &GenreRecord,
    key: &str,
    song_type: SongType,
    target_duration: f64,
) -> SongStructure {
    let song_type = if song_type == SongType::Standard && record.name == "electronic" {
        debug!(genre = %record.name, "using the edm template");
        SongType::Edm
    } else {
        song_type
    };

    let tempo = record.typical_tempo().max(1);
    let seconds_per_measure = 4.0 * 60.0 / tempo as f64;
    let base_energy = record.base_energy();

    let bridge_key = match parse_key(key) {
        Ok((pc, mode)) => key_name((pc + 5) % 12, mode),
        Err(_) => key.to_string(),
    };

    let mut sections = Vec::new();
    let mut key_plan = Vec::new();
    for &(section_type, share) in template(song_type) {
        let duration = share * target_duration;
        let measures = (duration / seconds_per_measure).round().max(1.0) as u32;
        let section_key = if section_type == SectionType::Bridge {
            bridge_key.clone()
        } else {
            key.to_string()
        };
        key_plan.push(section_key.clone());
        sections.push(Section {
            section_type,
            key: section_key,
            duration,
            measures,
            energy: (base_energy + energy_modifier(section_type)).clamp(0.0, 1.0),
            texture: None,
        });
    }

    let total_duration = sections.iter().map(|s| s.duration).sum();
    SongStructure {
        genre: record.name.clone(),
        sections,
        key_plan,
        tempo,
        time_signature: (4, 4),
        total_duration,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn durations_scale_to_the_target() {
        let record = GenreRecord::default_for("pop");
        let structure = create_structure(&record, "C", SongType::Standard, 180.0);
        assert!((structure.total_duration - 180.0).abs() < 1e-9);
        assert_eq!(structure.sections.len(), structure.key_plan.len());
        assert!(structure.sections.iter().all(|s| s.measures >= 1));
    }

    #[test]
    fn chorus_runs_hotter_than_intro() {
        let record = GenreRecord::default_for("rock");
        let structure = create_structure(&record, "E", SongType::Standard, 200.0);
        let intro = &structure.sections[0];
        let chorus = structure
            .sections
            .iter()
            .find(|s| s.section_type == SectionType::Chorus)
            .unwrap();
        assert_eq!(intro.section_type, SectionType::Intro);
        assert!(chorus.energy > intro.energy);
    }

    #[test]
    fn energy_stays_in_unit_range() {
        let mut record = GenreRecord::default_for("metal");
        record
            .characteristics
            .insert("energy".into(), "0.95".into());
        let structure = create_structure(&record, "E", SongType::Epic, 300.0);
        assert!(structure
            .sections
            .iter()
            .all(|s| (0.0..=1.0).contains(&s.energy)));
    }

    #[test]
    fn bridge_moves_to_the_subdominant() {
        let record = GenreRecord::default_for("pop");
        let structure = create_structure(&record, "C", SongType::Standard, 180.0);
        let bridge = structure
            .sections
            .iter()
            .find(|s| s.section_type == SectionType::Bridge)
            .unwrap();
        assert_eq!(bridge.key, "F");
        assert_eq!(structure.sections[0].key, "C");
    }

    #[test]
    fn electronic_standard_uses_the_edm_shape() {
        let record = GenreRecord::default_for("electronic");
        let structure = create_structure(&record, "Am", SongType::Standard, 240.0);
        assert!(structure
            .sections
            .iter()
            .any(|s| s.section_type == SectionType::Buildup));
        assert!(structure
            .sections
            .iter()
            .any(|s| s.section_type == SectionType::Breakdown));
    }
}
