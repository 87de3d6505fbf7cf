//! Name search: request model, query planning shared by both backends, and
//! the final scoring/ranking pass.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Result, TaxonomyError};
use crate::rank::RankLevel;
use crate::row::{COL_COMMON, COL_NAME};
use crate::scoring::score_match;
use crate::taxon::Taxon;

/// Candidate pool floor when fuzzy re-ranking is on.
const FUZZY_MIN_CANDIDATES: usize = 50;
const FUZZY_CANDIDATE_FACTOR: usize = 5;

pub const DEFAULT_THRESHOLD: f64 = 0.8;
pub const DEFAULT_LIMIT: i64 = 20;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    Scientific,
    Vernacular,
}

impl SearchScope {
    pub fn column(self) -> &'static str {
        match self {
            Self::Scientific => COL_NAME,
            Self::Vernacular => COL_COMMON,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Exact,
    Prefix,
    Substring,
    #[default]
    Auto,
}

impl MatchMode {
    /// Concrete modes to try, in order. `Auto` stops at the first that hits.
    pub fn attempts(self) -> &'static [MatchMode] {
        match self {
            Self::Exact => &[Self::Exact],
            Self::Prefix => &[Self::Prefix],
            Self::Substring => &[Self::Substring],
            Self::Auto => &[Self::Exact, Self::Prefix, Self::Substring],
        }
    }

    /// Bind value for a lower-cased, trimmed query. Exact compares with `=`,
    /// the others with `LIKE ... ESCAPE '\'`.
    pub fn pattern(self, query: &str) -> String {
        match self {
            Self::Exact | Self::Auto => query.to_string(),
            Self::Prefix => format!("{}%", escape_like(query)),
            Self::Substring => format!("%{}%", escape_like(query)),
        }
    }

    pub fn uses_like(self) -> bool {
        matches!(self, Self::Prefix | Self::Substring)
    }
}

/// Escape `%`, `_` and the escape character itself.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub scopes: HashSet<SearchScope>,
    pub match_mode: MatchMode,
    pub fuzzy: bool,
    pub threshold: f64,
    pub limit: i64,
    pub rank_filter: Option<BTreeSet<RankLevel>>,
    pub with_scores: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            scopes: [SearchScope::Scientific, SearchScope::Vernacular].into(),
            match_mode: MatchMode::Auto,
            fuzzy: true,
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_LIMIT,
            rank_filter: None,
            with_scores: false,
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn scopes(mut self, scopes: impl IntoIterator<Item = SearchScope>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn rank_filter(mut self, ranks: impl IntoIterator<Item = RankLevel>) -> Self {
        self.rank_filter = Some(ranks.into_iter().collect());
        self
    }

    pub fn with_scores(mut self, with_scores: bool) -> Self {
        self.with_scores = with_scores;
        self
    }

    /// Validate and normalize into a plan. `Ok(None)` for a blank query.
    pub fn plan(&self) -> Result<Option<SearchPlan>> {
        if self.limit <= 0 {
            return Err(TaxonomyError::InvalidArgument(format!(
                "search limit must be positive, got {}",
                self.limit
            )));
        }
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(None);
        }
        let limit = self.limit as usize;
        let candidate_limit = if self.fuzzy {
            (limit * FUZZY_CANDIDATE_FACTOR).max(FUZZY_MIN_CANDIDATES)
        } else {
            limit
        };
        // No scope selected searches both name columns.
        let mut columns: Vec<&'static str> = if self.scopes.is_empty() {
            vec![COL_NAME, COL_COMMON]
        } else {
            let mut scopes: Vec<_> = self.scopes.iter().copied().collect();
            scopes.sort();
            scopes.into_iter().map(SearchScope::column).collect()
        };
        columns.dedup();
        Ok(Some(SearchPlan {
            query,
            columns,
            attempts: self.match_mode.attempts(),
            // An empty filter restricts nothing.
            ranks: self
                .rank_filter
                .as_ref()
                .filter(|r| !r.is_empty())
                .map(|r| r.iter().copied().collect()),
            candidate_limit,
        }))
    }
}

/// Normalized, backend-neutral description of the candidate query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    /// Trimmed and lower-cased.
    pub query: String,
    pub columns: Vec<&'static str>,
    pub attempts: &'static [MatchMode],
    pub ranks: Option<Vec<RankLevel>>,
    pub candidate_limit: usize,
}

impl SearchPlan {
    /// Stored `"rankLevel"` values to accept, including the scaled spelling
    /// of half-step ranks.
    pub fn rank_values(&self) -> Option<Vec<f64>> {
        self.ranks.as_ref().map(|ranks| {
            ranks
                .iter()
                .flat_map(|r| {
                    let v = r.value();
                    let scaled = (v.fract() != 0.0).then_some(v * 10.0);
                    std::iter::once(v).chain(scaled)
                })
                .collect()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub taxon: Taxon,
    pub score: Option<f64>,
}

/// Score, filter, order and truncate the candidate superset.
pub fn rank_hits(request: &SearchRequest, candidates: Vec<Taxon>) -> Vec<SearchHit> {
    let mut scored: Vec<(f64, Taxon)> = candidates
        .into_iter()
        .filter_map(|taxon| {
            if !request.fuzzy {
                return Some((1.0, taxon));
            }
            let score = score_match(
                &request.query,
                Some(&taxon.scientific_name),
                taxon.common_name(),
                &request.scopes,
            );
            (score >= request.threshold).then_some((score, taxon))
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.rank_level.cmp(&b.rank_level))
            .then_with(|| a.scientific_name.cmp(&b.scientific_name))
    });
    scored.truncate(request.limit.max(0) as usize);

    scored
        .into_iter()
        .map(|(score, taxon)| SearchHit {
            taxon,
            score: request.with_scores.then_some(score),
        })
        .collect()
}
