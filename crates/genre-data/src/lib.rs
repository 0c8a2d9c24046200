//! Per-genre musical knowledge for the composition engine.
//!
//! One record per genre: tempo range, named roman-numeral progressions,
//! rhythm feels, favored scales, and instrumentation tiers. Records are
//! served through a read-through cache backed by JSON files, with a
//! built-in table and synthesized defaults behind it — asking for a
//! genre never fails, it degrades.

pub mod builtin;
pub mod compare;
pub mod record;
pub mod store;

pub use builtin::{builtin_genre_names, builtin_record};
pub use compare::{compare_genres, GenreComparison};
pub use record::{GenreRecord, Instrumentation, ProgressionPattern, RhythmSpec};
pub use store::GenreStore;

use thiserror::Error;

/// I/O and serialization failures from the backing store. Missing data
/// is never an error; these only surface when the filesystem itself
/// misbehaves during an explicit persist.
#[derive(Debug, Error)]
pub enum GenreStoreError {
    #[error("genre store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("genre record serialization: {0}")]
    Json(#[from] serde_json::Error),
}
