//! Genre-aware composition on top of the theory and genre-data layers:
//! progressions, melodies, beats and bass lines, song structures, motif
//! development, ensemble arrangement, and an end-to-end pipeline that
//! turns a free-text request into a scored [`CompleteComposition`].
//!
//! Generation is deterministic given a seeded [`rand::Rng`]; every
//! stochastic operation takes the generator as a parameter. Unknown
//! genres synthesize defaults rather than failing; unknown ensembles are
//! a hard error.
//!
//! [`CompleteComposition`]: types::CompleteComposition

use thiserror::Error;

pub mod arrange;
pub mod generate;
pub mod motif;
pub mod quality;
pub mod refine;
pub mod song;
pub mod structure;
pub mod types;

pub use arrange::{
    arrange, counter_melody, ensemble_names, ensemble_seats, plan_texture, CounterMelody,
    EnsembleSeat,
};
pub use generate::{BassStyle, Complexity, Composer, MelodyStyle};
pub use motif::{
    create_phrase, develop_motif, CadencePlan, MotifDevelopment, Phrase, PhraseForm, PhraseStyle,
    PhraseType, Technique,
};
pub use quality::analyze_quality;
pub use refine::{refine, FocusArea};
pub use song::{compose_complete_song, CompositionRequest, Mood};
pub use structure::{create_structure, SongType};
pub use types::{
    Arrangement, BeatPattern, CompleteComposition, DynamicLevel, InstrumentPart, InstrumentRole,
    Melody, Motif, NoteSource, QualityReport, Register, Section, SectionType, SongStructure,
};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("unknown ensemble type: {0}")]
    UnknownEnsemble(String),

    #[error(transparent)]
    Theory(#[from] music_theory::TheoryError),

    #[error(transparent)]
    Genre(#[from] genre_data::GenreStoreError),
}
