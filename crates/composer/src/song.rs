//! End-to-end composition pipeline. Stages run in a fixed order — parse,
//! structure, harmony, melody, variations, arrange, texture, assemble —
//! and never revisit an earlier stage within one run.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use music_theory::chord::Voicing;
use music_theory::key::parse_key;
use music_theory::progression::{create_progression, ChordProgression};

use crate::arrange::{arrange, plan_texture};
use crate::generate::{Composer, MelodyStyle};
use crate::quality::analyze_quality;
use crate::structure::{create_structure, SongType};
use crate::types::{CompleteComposition, DynamicLevel, Melody, SongStructure};
use crate::ComposeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRequest {
    /// Free text; mood and song shape are read from it by keyword.
    pub description: String,
    pub genre: String,
    pub key: String,
    /// Overrides the genre's typical tempo when set.
    pub tempo: Option<u32>,
    /// Seconds.
    pub target_duration: f64,
    pub ensemble: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Sad,
    Energetic,
    Calm,
    Dark,
    Uplifting,
}

static MOOD_KEYWORDS: &[(Mood, &[&str])] = &[
    (Mood::Happy, &["happy", "joyful", "cheerful", "bright"]),
    (Mood::Sad, &["sad", "melancholy", "mournful", "longing"]),
    (Mood::Energetic, &["energetic", "driving", "intense", "fast"]),
    (Mood::Calm, &["calm", "peaceful", "gentle", "relaxed"]),
    (Mood::Dark, &["dark", "ominous", "brooding", "sinister"]),
    (Mood::Uplifting, &["uplifting", "soaring", "triumphant", "hopeful"]),
];

pub fn extract_mood(description: &str) -> Option<Mood> {
    let lowered = description.to_ascii_lowercase();
    for (mood, keywords) in MOOD_KEYWORDS {
        if keywords.iter().any(|k| lowered.contains(k)) {
            return Some(*mood);
        }
    }
    None
}

fn song_type_for(description: &str) -> SongType {
    let lowered = description.to_ascii_lowercase();
    if ["ballad", "slow", "tender"].iter().any(|k| lowered.contains(k)) {
        SongType::Ballad
    } else if ["epic", "journey", "anthem"].iter().any(|k| lowered.contains(k)) {
        SongType::Epic
    } else if ["dance", "club", "drop"].iter().any(|k| lowered.contains(k)) {
        SongType::Edm
    } else {
        SongType::Standard
    }
}

/// Last-resort progressions when neither the composer nor the genre
/// record yields chords.
fn fallback_numerals(genre: &str) -> &'static [&'static str] {
    match genre {
        "blues" => &[
            "I", "I", "I", "I", "IV", "IV", "I", "I", "V", "IV", "I", "V",
        ],
        "jazz" => &["ii7", "V7", "Imaj7", "Imaj7"],
        "rock" | "metal" => &["I", "bVII", "IV", "I"],
        _ => &["I", "V", "vi", "IV"],
    }
}

/// Register and chromatic adjustments per mood, applied to the assembled
/// melody. Shifts saturate into [0, 127] rather than erroring.
fn apply_mood(melody: &mut Melody, mood: Mood, key_pc: u8) {
    let shift: i16 = match mood {
        Mood::Happy | Mood::Calm => 0,
        Mood::Uplifting => 12,
        Mood::Energetic => 7,
        Mood::Sad | Mood::Dark => -12,
    };
    for note in melody.notes.iter_mut() {
        let mut adjusted = *note as i16 + shift;
        if mood == Mood::Dark {
            // Flatten major thirds over the tonic for a minor cast.
            if (adjusted - key_pc as i16).rem_euclid(12) == 4 {
                adjusted -= 1;
            }
        }
        *note = adjusted.clamp(0, 127) as u8;
    }
}

fn dynamic_for_energy(energy: f64) -> DynamicLevel {
    if energy < 0.25 {
        DynamicLevel::P
    } else if energy < 0.45 {
        DynamicLevel::Mp
    } else if energy < 0.65 {
        DynamicLevel::Mf
    } else if energy < 0.85 {
        DynamicLevel::F
    } else {
        DynamicLevel::Ff
    }
}

fn dynamic_plan_from(structure: &SongStructure) -> Vec<DynamicLevel> {
    structure
        .sections
        .iter()
        .map(|s| dynamic_for_energy(s.energy))
        .collect()
}

fn title_from(request: &CompositionRequest) -> String {
    let words: Vec<&str> = request.description.split_whitespace().take(4).collect();
    if words.is_empty() {
        format!("{} in {}", request.genre, request.key)
    } else {
        let mut title = String::new();
        for word in words {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                if !title.is_empty() {
                    title.push(' ');
                }
                title.extend(first.to_uppercase());
                title.push_str(chars.as_str());
            }
        }
        title
    }
}

fn extend_progression(target: &mut ChordProgression, base: &ChordProgression) {
    target.chords.extend(base.chords.iter().cloned());
    target
        .roman_numerals
        .extend(base.roman_numerals.iter().cloned());
    target.durations.extend(base.durations.iter().copied());
}

fn extend_melody(target: &mut Melody, phrase: &Melody) {
    target.notes.extend(phrase.notes.iter().copied());
    target.rhythm.extend(phrase.rhythm.iter().copied());
    target.sources.extend(phrase.sources.iter().copied());
}

/// Compose a complete song from a request: structure from the genre and
/// description, harmony with a cascading fallback chain, a melody
/// repeated to the target beat count with a variation every fourth
/// statement, mood adjustment, arrangement, and a texture plan, finally
/// scored into a quality report.
pub fn compose_complete_song(
    composer: &Composer,
    request: &CompositionRequest,
    rng: &mut impl Rng,
) -> Result<CompleteComposition, ComposeError> {
    // Parse.
    let record = composer.genres().get_or_create(&request.genre)?;
    let mood = extract_mood(&request.description);
    let song_type = song_type_for(&request.description);
    info!(
        genre = %request.genre,
        key = %request.key,
        ?mood,
        "composing"
    );

    // Structure.
    let mut structure = create_structure(&record, &request.key, song_type, request.target_duration);
    if let Some(tempo) = request.tempo {
        structure.tempo = tempo.max(1);
    }
    let tempo = structure.tempo;

    // Harmony, with the fallback chain.
    let mut base = composer.create_progression(&request.genre, &request.key, "standard", None)?;
    if base.is_empty() {
        warn!(genre = %request.genre, "no composed chords, trying genre record progressions");
        if let Some(pattern) = record.progressions.values().next() {
            let numerals: Vec<&str> = pattern.pattern.iter().map(String::as_str).collect();
            base = create_progression(&request.key, &numerals, 4.0, Voicing::Close);
        }
    }
    if base.is_empty() {
        warn!(genre = %request.genre, "falling back to the built-in progression table");
        base = create_progression(
            &request.key,
            fallback_numerals(&request.genre),
            4.0,
            Voicing::Close,
        );
    }

    // Melody.
    let base_melody = composer.create_melody(
        &request.genre,
        &request.key,
        &base,
        MelodyStyle::Typical,
        rng,
    )?;

    // Variations: repeat to the target beat count, transposing every
    // fourth statement up a step and back to break exact looping.
    let target_beats = request.target_duration * tempo as f64 / 60.0;
    let mut harmony = base.clone();
    let mut melody = base_melody.clone();
    let mut statement = 1u32;
    while harmony.total_duration() < target_beats && base.total_duration() > 0.0 {
        statement += 1;
        extend_progression(&mut harmony, &base);
        let mut phrase = base_melody.clone();
        if statement % 4 == 0 {
            debug!(statement, "varying the repeated phrase");
            for note in phrase.notes.iter_mut() {
                *note = (*note as i16 + 2).clamp(0, 127) as u8;
            }
        }
        extend_melody(&mut melody, &phrase);
    }

    if let Some(mood) = mood {
        let (key_pc, _) = parse_key(&request.key)?;
        apply_mood(&mut melody, mood, key_pc);
    }

    // Arrange, then plan texture over the structure.
    let style = request.genre.clone();
    let arrangement = arrange(&melody, &harmony, &request.ensemble, &style, rng)?;
    let dynamic_plan = dynamic_plan_from(&structure);
    plan_texture(&mut structure, &dynamic_plan, rng);

    // Assemble and score.
    let mut composition = CompleteComposition {
        title: title_from(request),
        genre: request.genre.clone(),
        key: request.key.clone(),
        tempo,
        time_signature: structure.time_signature,
        structure,
        melody,
        harmony,
        arrangement,
        quality: crate::types::QualityReport {
            melody: 0.0,
            harmony: 0.0,
            rhythm: 0.0,
            form: 0.0,
            arrangement: 0.0,
            overall: 0.0,
            issues: Vec::new(),
            suggestions: Vec::new(),
        },
    };
    composition.quality = analyze_quality(&composition);
    Ok(composition)
}
