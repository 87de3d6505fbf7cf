//! Fuzzy name scoring.
//!
//! Plain ratio is normalized Levenshtein from `strsim`; the token-sort,
//! token-set and partial-window variants make word order and extra words
//! cheap, and are slightly down-weighted so an exact spelling always wins.

use std::collections::{BTreeSet, HashSet};

use crate::search::SearchScope;

const TOKEN_WEIGHT: f64 = 0.95;
const PARTIAL_WEIGHT: f64 = 0.9;
/// Partial matching only kicks in when one string is this much longer.
const PARTIAL_LENGTH_RATIO: f64 = 1.5;

/// Best similarity in `[0, 1]` between `query` and the names of the enabled
/// scopes. Falls back to whichever name exists when no scope applies.
pub fn score_match(
    query: &str,
    scientific_name: Option<&str>,
    vernacular_name: Option<&str>,
    scopes: &HashSet<SearchScope>,
) -> f64 {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return 0.0;
    }

    fn present(n: Option<&str>) -> Option<&str> {
        n.map(str::trim).filter(|n| !n.is_empty())
    }
    let mut candidates: Vec<&str> = Vec::with_capacity(2);
    if scopes.contains(&SearchScope::Scientific) {
        candidates.extend(present(scientific_name));
    }
    if scopes.contains(&SearchScope::Vernacular) {
        candidates.extend(present(vernacular_name));
    }
    if candidates.is_empty() {
        match present(scientific_name).or(present(vernacular_name)) {
            Some(fallback) => candidates.push(fallback),
            None => return 0.0,
        }
    }

    candidates
        .into_iter()
        .map(|c| weighted_ratio(&query, &c.to_lowercase()))
        .fold(0.0, f64::max)
}

/// Token-aware similarity of two already-normalized strings.
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let plain = ratio(a, b);
    let sorted = ratio(&token_sort(a), &token_sort(b)) * TOKEN_WEIGHT;
    let set = token_set_ratio(a, b) * TOKEN_WEIGHT;

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let partial = if long.chars().count() as f64 / short.chars().count() as f64 >= PARTIAL_LENGTH_RATIO
    {
        partial_ratio(short, long) * PARTIAL_WEIGHT
    } else {
        0.0
    };

    plain.max(sorted).max(set).max(partial).clamp(0.0, 1.0)
}

fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

fn token_sort(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    let common: Vec<&str> = ta.intersection(&tb).copied().collect();
    let only_a: Vec<&str> = ta.difference(&tb).copied().collect();
    let only_b: Vec<&str> = tb.difference(&ta).copied().collect();

    let base = common.join(" ");
    let join = |rest: &[&str]| {
        if base.is_empty() {
            rest.join(" ")
        } else if rest.is_empty() {
            base.clone()
        } else {
            format!("{base} {}", rest.join(" "))
        }
    };
    let with_a = join(&only_a);
    let with_b = join(&only_b);

    let mut best = ratio(&with_a, &with_b);
    if !base.is_empty() {
        best = best.max(ratio(&base, &with_a)).max(ratio(&base, &with_b));
    }
    best
}

/// Best ratio of `short` against every equally long window of `long`.
fn partial_ratio(short: &str, long: &str) -> f64 {
    let long_chars: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    if width == 0 || width > long_chars.len() {
        return 0.0;
    }
    long_chars
        .windows(width)
        .map(|w| ratio(short, &w.iter().collect::<String>()))
        .fold(0.0, f64::max)
}
