use serde::{Deserialize, Serialize};

use crate::record::GenreRecord;

/// Parent genre → child genres, for sibling and ancestry scoring.
static FAMILIES: &[(&str, &[&str])] = &[
    ("rock", &["metal", "punk", "grunge"]),
    ("jazz", &["bebop", "swing", "fusion"]),
    ("electronic", &["house", "techno", "trance", "dubstep"]),
    ("folk", &["country", "bluegrass"]),
    ("blues", &["rock", "jazz"]),
];

/// Unordered pairs considered stylistically related.
static RELATED: &[(&str, &str)] = &[
    ("funk", "jazz"),
    ("funk", "latin"),
    ("reggae", "latin"),
    ("pop", "rock"),
    ("pop", "electronic"),
    ("country", "folk"),
    ("blues", "country"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreComparison {
    pub score: f64,
    /// "identical", "parent_child", "related", "siblings", "unrelated".
    pub relationship: String,
    pub shared_instruments: Vec<String>,
    pub shared_progressions: Vec<String>,
}

fn parent_of(genre: &str) -> Option<&'static str> {
    FAMILIES
        .iter()
        .find(|(_, children)| children.contains(&genre))
        .map(|(parent, _)| *parent)
}

fn is_parent_child(a: &str, b: &str) -> bool {
    parent_of(a) == Some(b) || parent_of(b) == Some(a)
}

fn is_related(a: &str, b: &str) -> bool {
    RELATED
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
        || FAMILIES
            .iter()
            .any(|&(p, children)| {
                (p == a && children.contains(&b)) || (p == b && children.contains(&a))
            })
}

/// Score how close two genres are.
///
/// Fixed rule cascade: identical 1.0, parent/child 0.9, listed as
/// related 0.8, siblings under one parent 0.7, otherwise 0.1. Shared
/// instrumentation and progression names ride along for context.
pub fn compare_genres(a: &GenreRecord, b: &GenreRecord) -> GenreComparison {
    let name_a = a.name.to_ascii_lowercase();
    let name_b = b.name.to_ascii_lowercase();

    let (score, relationship) = if name_a == name_b {
        (1.0, "identical")
    } else if is_parent_child(&name_a, &name_b) {
        (0.9, "parent_child")
    } else if is_related(&name_a, &name_b) {
        (0.8, "related")
    } else if parent_of(&name_a).is_some() && parent_of(&name_a) == parent_of(&name_b) {
        (0.7, "siblings")
    } else {
        (0.1, "unrelated")
    };

    let instruments_b = b.instrumentation.all();
    let shared_instruments = a
        .instrumentation
        .all()
        .into_iter()
        .filter(|i| instruments_b.contains(i))
        .map(|i| i.to_string())
        .collect();

    let shared_progressions = a
        .progressions
        .keys()
        .filter(|k| b.progressions.contains_key(*k))
        .cloned()
        .collect();

    GenreComparison {
        score,
        relationship: relationship.to_string(),
        shared_instruments,
        shared_progressions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::builtin_record;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_genres_score_one() {
        let jazz = builtin_record("jazz").unwrap();
        let comparison = compare_genres(&jazz, &jazz.clone());
        assert_eq!(comparison.score, 1.0);
        assert_eq!(comparison.relationship, "identical");
    }

    #[test]
    fn parent_child_scores_high() {
        let rock = builtin_record("rock").unwrap();
        let metal = builtin_record("metal").unwrap();
        let comparison = compare_genres(&rock, &metal);
        assert_eq!(comparison.score, 0.9);
        assert_eq!(comparison.relationship, "parent_child");
    }

    #[test]
    fn related_pair_scores() {
        let pop = builtin_record("pop").unwrap();
        let rock = builtin_record("rock").unwrap();
        let comparison = compare_genres(&pop, &rock);
        assert_eq!(comparison.score, 0.8);
    }

    #[test]
    fn unrelated_floor() {
        let metal = builtin_record("metal").unwrap();
        let reggae = builtin_record("reggae").unwrap();
        let comparison = compare_genres(&metal, &reggae);
        assert_eq!(comparison.score, 0.1);
        assert_eq!(comparison.relationship, "unrelated");
    }

    #[test]
    fn shared_sets_reported() {
        let jazz = builtin_record("jazz").unwrap();
        let blues = builtin_record("blues").unwrap();
        let comparison = compare_genres(&jazz, &blues);
        assert!(comparison
            .shared_progressions
            .contains(&"standard".to_string()));
        assert!(comparison
            .shared_instruments
            .contains(&"drums".to_string()));
    }
}
