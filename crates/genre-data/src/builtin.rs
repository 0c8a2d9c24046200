//! Built-in genre knowledge, shipped with the crate the same way chord
//! and scale tables are. The store consults these before synthesizing a
//! generic default.

use std::collections::BTreeMap;

use crate::record::{GenreRecord, Instrumentation, ProgressionPattern, RhythmSpec};

fn rhythm(feel: &str, emphasis: &[u8], subdivision: u8) -> RhythmSpec {
    RhythmSpec {
        feel: feel.into(),
        emphasis: emphasis.to_vec(),
        subdivision,
    }
}

fn characteristics(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

struct GenreSpec {
    name: &'static str,
    tempo: [u32; 2],
    progressions: &'static [(&'static str, &'static [&'static str], u32)],
    feel: &'static str,
    emphasis: &'static [u8],
    subdivision: u8,
    scales: &'static [&'static str],
    essential: &'static [&'static str],
    typical: &'static [&'static str],
    optional: &'static [&'static str],
    energy: &'static str,
}

static GENRES: &[GenreSpec] = &[
    GenreSpec {
        name: "pop",
        tempo: [90, 130],
        progressions: &[
            ("standard", &["I", "V", "vi", "IV"], 4),
            ("ballad", &["I", "vi", "IV", "V"], 4),
            ("anthem", &["vi", "IV", "I", "V"], 4),
        ],
        feel: "straight",
        emphasis: &[1, 3],
        subdivision: 2,
        scales: &["major", "major_pentatonic"],
        essential: &["vocals", "drums", "bass"],
        typical: &["piano", "guitar", "synth"],
        optional: &["strings"],
        energy: "0.6",
    },
    GenreSpec {
        name: "rock",
        tempo: [100, 160],
        progressions: &[
            ("standard", &["I", "IV", "V", "IV"], 4),
            ("power", &["I", "bVII", "IV", "I"], 4),
            ("minor", &["i", "bVII", "bVI", "V"], 4),
        ],
        feel: "straight",
        emphasis: &[1, 3],
        subdivision: 2,
        scales: &["major", "minor_pentatonic", "blues"],
        essential: &["electric_guitar", "bass", "drums"],
        typical: &["vocals", "rhythm_guitar"],
        optional: &["keys", "organ"],
        energy: "0.8",
    },
    GenreSpec {
        name: "jazz",
        tempo: [80, 220],
        progressions: &[
            ("standard", &["ii7", "V7", "Imaj7", "Imaj7"], 4),
            ("turnaround", &["Imaj7", "vi7", "ii7", "V7"], 4),
            ("blues", &["I7", "IV7", "I7", "V7"], 4),
        ],
        feel: "swing",
        emphasis: &[2, 4],
        subdivision: 3,
        scales: &["major", "dorian", "mixolydian", "bebop_dominant", "altered"],
        essential: &["piano", "upright_bass", "drums"],
        typical: &["saxophone", "trumpet", "guitar"],
        optional: &["trombone", "vibraphone"],
        energy: "0.5",
    },
    GenreSpec {
        name: "blues",
        tempo: [60, 120],
        progressions: &[
            (
                "standard",
                &["I7", "I7", "I7", "I7", "IV7", "IV7", "I7", "I7", "V7", "IV7", "I7", "V7"],
                12,
            ),
            ("quick_change", &["I7", "IV7", "I7", "I7"], 4),
        ],
        feel: "shuffle",
        emphasis: &[2, 4],
        subdivision: 3,
        scales: &["blues", "minor_pentatonic", "mixolydian"],
        essential: &["guitar", "bass", "drums"],
        typical: &["harmonica", "piano", "vocals"],
        optional: &["horns"],
        energy: "0.5",
    },
    GenreSpec {
        name: "folk",
        tempo: [80, 120],
        progressions: &[
            ("standard", &["I", "IV", "I", "V"], 4),
            ("modal", &["I", "bVII", "I", "IV"], 4),
        ],
        feel: "straight",
        emphasis: &[1],
        subdivision: 2,
        scales: &["major", "mixolydian", "dorian"],
        essential: &["acoustic_guitar", "vocals"],
        typical: &["fiddle", "banjo", "upright_bass"],
        optional: &["mandolin", "accordion"],
        energy: "0.4",
    },
    GenreSpec {
        name: "country",
        tempo: [90, 140],
        progressions: &[
            ("standard", &["I", "IV", "V", "I"], 4),
            ("truck", &["I", "V", "IV", "I"], 4),
        ],
        feel: "straight",
        emphasis: &[1, 3],
        subdivision: 2,
        scales: &["major", "major_pentatonic"],
        essential: &["acoustic_guitar", "bass", "drums", "vocals"],
        typical: &["pedal_steel", "fiddle", "telecaster"],
        optional: &["banjo", "piano"],
        energy: "0.5",
    },
    GenreSpec {
        name: "electronic",
        tempo: [110, 150],
        progressions: &[
            ("standard", &["i", "bVI", "bIII", "bVII"], 4),
            ("lift", &["vi", "IV", "I", "V"], 4),
        ],
        feel: "straight",
        emphasis: &[1, 2, 3, 4],
        subdivision: 4,
        scales: &["natural_minor", "dorian", "phrygian"],
        essential: &["synth_lead", "synth_bass", "drum_machine"],
        typical: &["pads", "arpeggiator"],
        optional: &["vocal_chops", "fx"],
        energy: "0.8",
    },
    GenreSpec {
        name: "classical",
        tempo: [60, 140],
        progressions: &[
            ("standard", &["I", "IV", "V", "I"], 4),
            ("period", &["I", "V", "V", "I"], 4),
            ("sequence", &["I", "V", "vi", "iii", "IV", "I", "IV", "V"], 8),
        ],
        feel: "straight",
        emphasis: &[1],
        subdivision: 2,
        scales: &["major", "harmonic_minor", "melodic_minor"],
        essential: &["violin", "viola", "cello", "double_bass"],
        typical: &["flute", "oboe", "clarinet", "bassoon", "horn"],
        optional: &["timpani", "harp"],
        energy: "0.4",
    },
    GenreSpec {
        name: "funk",
        tempo: [95, 120],
        progressions: &[
            ("standard", &["i7", "i7", "iv7", "i7"], 4),
            ("one_chord", &["i7", "i7", "i7", "i7"], 4),
        ],
        feel: "syncopated",
        emphasis: &[1],
        subdivision: 4,
        scales: &["dorian", "minor_pentatonic", "blues"],
        essential: &["bass", "drums", "rhythm_guitar"],
        typical: &["horns", "clavinet", "vocals"],
        optional: &["organ", "percussion"],
        energy: "0.85",
    },
    GenreSpec {
        name: "reggae",
        tempo: [70, 90],
        progressions: &[
            ("standard", &["I", "V", "vi", "IV"], 4),
            ("minor", &["i", "bVII", "i", "bVII"], 4),
        ],
        feel: "syncopated",
        emphasis: &[2, 4],
        subdivision: 2,
        scales: &["major", "natural_minor"],
        essential: &["bass", "drums", "skank_guitar"],
        typical: &["organ", "vocals"],
        optional: &["horns", "melodica"],
        energy: "0.45",
    },
    GenreSpec {
        name: "latin",
        tempo: [90, 130],
        progressions: &[
            ("standard", &["i", "iv", "V7", "i"], 4),
            ("montuno", &["ii7", "V7", "ii7", "V7"], 4),
        ],
        feel: "syncopated",
        emphasis: &[1, 4],
        subdivision: 2,
        scales: &["harmonic_minor", "major", "dorian"],
        essential: &["piano", "bass", "congas", "timbales"],
        typical: &["horns", "vocals", "guiro"],
        optional: &["flute", "vibraphone"],
        energy: "0.75",
    },
    GenreSpec {
        name: "metal",
        tempo: [120, 200],
        progressions: &[
            ("standard", &["i", "bVI", "bVII", "i"], 4),
            ("chug", &["i", "i", "bII", "i"], 4),
        ],
        feel: "straight",
        emphasis: &[1, 3],
        subdivision: 4,
        scales: &["natural_minor", "phrygian", "phrygian_dominant", "locrian"],
        essential: &["distorted_guitar", "bass", "double_kick_drums"],
        typical: &["vocals", "second_guitar"],
        optional: &["keys"],
        energy: "0.95",
    },
];

/// Look up a built-in genre record by name (case-insensitive).
pub fn builtin_record(name: &str) -> Option<GenreRecord> {
    let lowered = name.to_ascii_lowercase();
    let spec = GENRES.iter().find(|g| g.name == lowered)?;

    let progressions = spec
        .progressions
        .iter()
        .map(|&(pname, numerals, bars)| {
            (pname.to_string(), ProgressionPattern::new(numerals, bars))
        })
        .collect();

    let mut rhythms = BTreeMap::new();
    rhythms.insert(
        "basic".to_string(),
        rhythm(spec.feel, spec.emphasis, spec.subdivision),
    );

    Some(GenreRecord {
        name: spec.name.to_string(),
        tempo_range: spec.tempo,
        progressions,
        rhythms,
        scales: spec.scales.iter().map(|s| s.to_string()).collect(),
        instrumentation: Instrumentation::new(spec.essential, spec.typical, spec.optional),
        characteristics: characteristics(&[("energy", spec.energy)]),
    })
}

/// Names of all built-in genres.
pub fn builtin_genre_names() -> Vec<&'static str> {
    GENRES.iter().map(|g| g.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_genres_resolve() {
        for name in builtin_genre_names() {
            let record = builtin_record(name).unwrap();
            assert_eq!(record.name, name);
            assert!(record.progressions.contains_key("standard"));
            assert!(record.tempo_range[0] < record.tempo_range[1]);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(builtin_record("Jazz").is_some());
        assert!(builtin_record("METAL").is_some());
    }

    #[test]
    fn unknown_genre_is_none() {
        assert!(builtin_record("vaporwave").is_none());
    }

    #[test]
    fn twelve_bar_blues_spans_twelve_bars() {
        let blues = builtin_record("blues").unwrap();
        let standard = blues.progression("standard").unwrap();
        assert_eq!(standard.bars, 12);
        assert_eq!(standard.pattern.len(), 12);
    }
}
