//! Mapping a suggested category name onto a configured category record.
//!
//! The model is instructed to copy a name verbatim, but replies drift:
//! casing changes, spaces vanish, words get glued together. Resolution first
//! tries a normalized exact match and only then falls back to a cheap
//! similarity heuristic. The heuristic is deliberately not an edit
//! distance; it only needs to rank near-misses against a short list of
//! category names.

use crate::persistence::CategoryRecord;

/// A fuzzy candidate must score strictly above this to be considered.
const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Score assigned when one normalized name contains the other.
const SUBSTRING_SCORE: f64 = 0.8;

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Scores how similar a suggested name is to a candidate category name.
///
/// Returns `1.0` for normalized equality, [`SUBSTRING_SCORE`] when either
/// normalized name contains the other, and otherwise the fraction of the
/// suggestion's characters that appear anywhere in the candidate, over the
/// longer of the two lengths.
#[must_use]
pub fn similarity_score(suggested: &str, candidate: &str) -> f64 {
    let left = normalize(suggested);
    let right = normalize(candidate);

    if left == right {
        return 1.0;
    }

    if left.contains(&right) || right.contains(&left) {
        return SUBSTRING_SCORE;
    }

    let longest = left.chars().count().max(right.chars().count());
    if longest == 0 {
        return 0.0;
    }

    let common = left.chars().filter(|ch| right.contains(*ch)).count();
    common as f64 / longest as f64
}

/// Resolves a suggested category name against the configured categories.
///
/// The exact pass compares trimmed, lowercased names and returns the first
/// match in list order. The fuzzy pass tracks the best-scoring candidate; a
/// candidate replaces the running best only when its score is strictly
/// greater than both the best so far and [`SIMILARITY_THRESHOLD`], so ties
/// keep the earliest candidate and a score of exactly `0.6` never wins.
#[must_use]
pub fn resolve_category<'a>(
    suggested: &str,
    categories: &'a [CategoryRecord],
) -> Option<&'a CategoryRecord> {
    let wanted = normalize(suggested);

    if let Some(exact) = categories
        .iter()
        .find(|category| normalize(&category.name) == wanted)
    {
        return Some(exact);
    }

    let mut best: Option<&CategoryRecord> = None;
    let mut best_score = SIMILARITY_THRESHOLD;

    for candidate in categories {
        let score = similarity_score(suggested, &candidate.name);
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }

    best
}
