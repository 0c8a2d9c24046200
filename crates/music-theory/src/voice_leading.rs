use serde::{Deserialize, Serialize};

use crate::error::TheoryError;
use crate::progression::ChordProgression;

/// Penalty weights for voice-leading violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceLeadingRules {
    pub parallel_penalty: f64,
    /// Leaps beyond this many semitones are penalized.
    pub leap_threshold: u8,
    pub leap_penalty_per_semitone: f64,
    pub crossing_penalty: f64,
}

impl Default for VoiceLeadingRules {
    fn default() -> Self {
        VoiceLeadingRules {
            parallel_penalty: 100.0,
            leap_threshold: 12,
            leap_penalty_per_semitone: 2.0,
            crossing_penalty: 75.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    ParallelFifths,
    ParallelOctaves,
    LargeLeap,
    VoiceCrossing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLeadingProblem {
    /// Index of the chord where the problem lands.
    pub position: usize,
    pub kind: ProblemKind,
    pub description: String,
    pub severity: Severity,
}

/// A parallel perfect interval between two voices across a chord change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelMotion {
    pub position: usize,
    pub lower_voice: usize,
    pub upper_voice: usize,
    /// 7 for fifths, 0 for octaves/unisons.
    pub interval_class: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLeadingAnalysis {
    /// 0-100, higher is smoother.
    pub smooth_score: f64,
    pub problems: Vec<VoiceLeadingProblem>,
    pub suggestions: Vec<String>,
    pub parallel_motion: Vec<ParallelMotion>,
}

fn find_parallels(prev: &[u8], curr: &[u8], position: usize) -> Vec<ParallelMotion> {
    let mut parallels = Vec::new();
    let voices = prev.len().min(curr.len());
    for lower in 0..voices {
        for upper in (lower + 1)..voices {
            let before = (prev[upper] as i16 - prev[lower] as i16).rem_euclid(12) as u8;
            let after = (curr[upper] as i16 - curr[lower] as i16).rem_euclid(12) as u8;
            let both_moved = prev[lower] != curr[lower] && prev[upper] != curr[upper];
            let same_direction = (curr[lower] as i16 - prev[lower] as i16).signum()
                == (curr[upper] as i16 - prev[upper] as i16).signum();
            if both_moved && same_direction && before == after && (before == 7 || before == 0) {
                parallels.push(ParallelMotion {
                    position,
                    lower_voice: lower,
                    upper_voice: upper,
                    interval_class: before,
                });
            }
        }
    }
    parallels
}

/// Score the voice leading of a chord sequence.
///
/// Each chord is a set of sounding MIDI notes, ascending by voice. Starts
/// from 100 and subtracts rule-table penalties for parallel perfect
/// intervals, leaps past the threshold, and voices out of ascending order.
pub fn validate_voice_leading(chords: &[Vec<u8>]) -> VoiceLeadingAnalysis {
    validate_voice_leading_with(chords, &VoiceLeadingRules::default())
}

pub fn validate_voice_leading_with(
    chords: &[Vec<u8>],
    rules: &VoiceLeadingRules,
) -> VoiceLeadingAnalysis {
    let mut score = 100.0;
    let mut problems = Vec::new();
    let mut parallel_motion = Vec::new();

    for (i, chord) in chords.iter().enumerate() {
        // Voice crossing: notes must ascend voice by voice
        if chord.windows(2).any(|pair| pair[0] > pair[1]) {
            score -= rules.crossing_penalty;
            problems.push(VoiceLeadingProblem {
                position: i,
                kind: ProblemKind::VoiceCrossing,
                description: format!("voices cross in chord {}", i),
                severity: Severity::Error,
            });
        }

        if i == 0 {
            continue;
        }
        let prev = &chords[i - 1];

        for parallel in find_parallels(prev, chord, i) {
            score -= rules.parallel_penalty;
            let (kind, what) = if parallel.interval_class == 7 {
                (ProblemKind::ParallelFifths, "fifths")
            } else {
                (ProblemKind::ParallelOctaves, "octaves")
            };
            problems.push(VoiceLeadingProblem {
                position: i,
                kind,
                description: format!(
                    "parallel {} between voices {} and {} into chord {}",
                    what, parallel.lower_voice, parallel.upper_voice, i
                ),
                severity: Severity::Error,
            });
            parallel_motion.push(parallel);
        }

        let voices = prev.len().min(chord.len());
        for v in 0..voices {
            let leap = (chord[v] as i16 - prev[v] as i16).unsigned_abs() as u8;
            if leap > rules.leap_threshold {
                let excess = (leap - rules.leap_threshold) as f64;
                score -= excess * rules.leap_penalty_per_semitone;
                problems.push(VoiceLeadingProblem {
                    position: i,
                    kind: ProblemKind::LargeLeap,
                    description: format!(
                        "voice {} leaps {} semitones into chord {}",
                        v, leap, i
                    ),
                    severity: Severity::Warning,
                });
            }
        }
    }

    let mut suggestions = Vec::new();
    let kinds: Vec<ProblemKind> = problems.iter().map(|p| p.kind).collect();
    if kinds.contains(&ProblemKind::ParallelFifths) || kinds.contains(&ProblemKind::ParallelOctaves)
    {
        suggestions.push("use contrary or oblique motion between the offending voices".into());
    }
    if kinds.contains(&ProblemKind::LargeLeap) {
        suggestions.push("revoice so each voice moves to its nearest available chord tone".into());
    }
    if kinds.contains(&ProblemKind::VoiceCrossing) {
        suggestions.push("keep voices in ascending order within each chord".into());
    }

    VoiceLeadingAnalysis {
        smooth_score: score.clamp(0.0, 100.0),
        problems,
        suggestions,
        parallel_motion,
    }
}

/// Place a pitch class in the octave nearest a reference note.
fn nearest_octave(pitch_class: u8, reference: u8) -> i16 {
    let base = pitch_class as i16;
    let mut best = base;
    let mut best_dist = (base - reference as i16).abs();
    let mut candidate = base;
    while candidate <= 127 {
        let dist = (candidate - reference as i16).abs();
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
        candidate += 12;
    }
    best
}

fn total_motion(prev: &[u8], curr: &[u8]) -> f64 {
    prev.iter()
        .zip(curr.iter())
        .map(|(&a, &b)| (b as i16 - a as i16).abs() as f64)
        .sum()
}

fn candidate_cost(prev: &[u8], candidate: &[u8], rules: &VoiceLeadingRules) -> f64 {
    let mut cost = total_motion(prev, candidate);

    for (&a, &b) in prev.iter().zip(candidate.iter()) {
        let leap = (b as i16 - a as i16).unsigned_abs();
        if leap > rules.leap_threshold as u16 {
            cost += (leap - rules.leap_threshold as u16) as f64 * rules.leap_penalty_per_semitone;
        }
    }

    cost += find_parallels(prev, candidate, 0).len() as f64 * 20.0;

    // Contrary motion between outer voices lowers the cost
    if prev.len() >= 2 && candidate.len() >= 2 {
        let bass_dir = (candidate[0] as i16 - prev[0] as i16).signum();
        let top_dir = (candidate[candidate.len() - 1] as i16
            - prev[prev.len() - 1] as i16)
            .signum();
        if bass_dir != 0 && top_dir != 0 && bass_dir != top_dir {
            cost -= 2.0;
        }
    }

    cost
}

/// Re-voice a chord sequence to minimize total voice motion.
///
/// The first chord is kept as given. Each following chord is replaced by
/// the cheapest of up to 5 candidate voicings: tones mapped to the octave
/// nearest the previous voices, octave-shifted variants, and the original
/// voicing itself (so the result never moves more than the input did).
pub fn optimize_voice_leading(
    chords: &[Vec<u8>],
    voice_range: Option<(u8, u8)>,
) -> Vec<Vec<u8>> {
    let rules = VoiceLeadingRules::default();
    let (low, high) = voice_range.unwrap_or((36, 84));
    let mut result: Vec<Vec<u8>> = Vec::with_capacity(chords.len());

    for (i, chord) in chords.iter().enumerate() {
        if i == 0 || chord.is_empty() {
            result.push(chord.clone());
            continue;
        }
        let prev = result[i - 1].clone();

        let mut candidates: Vec<Vec<u8>> = Vec::with_capacity(5);

        // Each tone placed in the octave closest to the matching previous voice
        let mut nearest: Vec<i16> = chord
            .iter()
            .enumerate()
            .map(|(v, &note)| {
                let reference = prev.get(v).copied().unwrap_or(note);
                nearest_octave(note % 12, reference)
            })
            .collect();
        nearest.sort_unstable();
        let clamp_into = |notes: &[i16]| -> Option<Vec<u8>> {
            let mut out = Vec::with_capacity(notes.len());
            for &n in notes {
                if n < low as i16 || n > high as i16 {
                    return None;
                }
                out.push(n as u8);
            }
            Some(out)
        };

        if let Some(c) = clamp_into(&nearest) {
            candidates.push(c);
        }
        let up: Vec<i16> = nearest.iter().map(|&n| n + 12).collect();
        if let Some(c) = clamp_into(&up) {
            candidates.push(c);
        }
        let down: Vec<i16> = nearest.iter().map(|&n| n - 12).collect();
        if let Some(c) = clamp_into(&down) {
            candidates.push(c);
        }
        // Top voice dropped an octave, re-sorted (an inversion-flavored variant)
        if nearest.len() > 1 {
            let mut dropped = nearest.clone();
            let top = dropped.pop().expect("len checked");
            dropped.insert(0, top - 12);
            dropped.sort_unstable();
            if let Some(c) = clamp_into(&dropped) {
                candidates.push(c);
            }
        }
        // The original voicing always competes
        candidates.push(chord.clone());

        let best = candidates
            .into_iter()
            .min_by(|a, b| {
                candidate_cost(&prev, a, &rules).total_cmp(&candidate_cost(&prev, b, &rules))
            })
            .expect("at least the original candidate exists");
        // The penalty terms can favor a farther voicing; never let the
        // pick move more than the input did.
        if total_motion(&prev, &best) > total_motion(&prev, chord) {
            result.push(chord.clone());
        } else {
            result.push(best);
        }
    }

    result
}

/// Four independent voices realized from a melody and progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourPartHarmony {
    pub soprano: Vec<u8>,
    pub alto: Vec<u8>,
    pub tenor: Vec<u8>,
    pub bass: Vec<u8>,
}

const ALTO_RANGE: (u8, u8) = (55, 74);
const TENOR_RANGE: (u8, u8) = (48, 69);
const BASS_RANGE: (u8, u8) = (40, 62);

/// Shift a pitch class into a register band, centered as well as possible.
fn place_in_range(pitch_class: u8, range: (u8, u8)) -> u8 {
    let mid = (range.0 as i16 + range.1 as i16) / 2;
    let mut note = nearest_octave(pitch_class, mid as u8);
    while note < range.0 as i16 {
        note += 12;
    }
    while note > range.1 as i16 {
        note -= 12;
    }
    note.clamp(0, 127) as u8
}

/// Build four-part harmony under a melody.
///
/// The melody becomes the soprano; the bass takes each chord's root low;
/// alto and tenor fill chord tones not already sounding, doubling the
/// root when tones run out.
pub fn four_part_harmony(
    melody: &[u8],
    progression: &ChordProgression,
) -> Result<FourPartHarmony, TheoryError> {
    if melody.len() != progression.chords.len() {
        return Err(TheoryError::LengthMismatch {
            melody: melody.len(),
            progression: progression.chords.len(),
        });
    }

    let mut soprano = Vec::with_capacity(melody.len());
    let mut alto = Vec::with_capacity(melody.len());
    let mut tenor = Vec::with_capacity(melody.len());
    let mut bass = Vec::with_capacity(melody.len());

    for (&mel, chord) in melody.iter().zip(progression.chords.iter()) {
        let root_pc = chord.root.pitch_class();
        let bass_note = place_in_range(root_pc, BASS_RANGE);

        let tone_pcs = chord.pitch_classes();
        let mut used = vec![mel % 12, root_pc];
        let mut pick = |range: (u8, u8), used: &mut Vec<u8>| -> u8 {
            let pc = tone_pcs
                .iter()
                .copied()
                .find(|pc| !used.contains(pc))
                .unwrap_or(root_pc); // double the root when out of tones
            used.push(pc);
            place_in_range(pc, range)
        };

        let alto_note = pick(ALTO_RANGE, &mut used);
        let tenor_note = pick(TENOR_RANGE, &mut used);

        soprano.push(mel);
        alto.push(alto_note);
        tenor.push(tenor_note);
        bass.push(bass_note);
    }

    Ok(FourPartHarmony {
        soprano,
        alto,
        tenor,
        bass,
    })
}
