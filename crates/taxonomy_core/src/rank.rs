//! Rank model: ordered taxonomic ranks and the fixed major-rank subset.
//!
//! Finer ranks carry smaller values (species = 10, kingdom = 70). Two minor
//! ranks sit on half steps (33.5 zoosubsection, 34.5 parvorder); storage may
//! encode those either as the decimal value or scaled by ten (335 / 345).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxonomyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum RankLevel {
    L5,
    L10,
    L11,
    L12,
    L13,
    L15,
    L20,
    L24,
    L25,
    L26,
    L27,
    L30,
    L32,
    L33,
    L33_5,
    L34,
    L34_5,
    L35,
    L37,
    L40,
    L43,
    L44,
    L45,
    L47,
    L50,
    L53,
    L57,
    L60,
    L67,
    L70,
}

/// Major ranks, finest first.
pub const MAJOR_RANKS: [RankLevel; 7] = [
    RankLevel::L10,
    RankLevel::L20,
    RankLevel::L30,
    RankLevel::L40,
    RankLevel::L50,
    RankLevel::L60,
    RankLevel::L70,
];

impl RankLevel {
    /// Every canonical rank, finest first.
    pub const ALL: [RankLevel; 30] = [
        Self::L5,
        Self::L10,
        Self::L11,
        Self::L12,
        Self::L13,
        Self::L15,
        Self::L20,
        Self::L24,
        Self::L25,
        Self::L26,
        Self::L27,
        Self::L30,
        Self::L32,
        Self::L33,
        Self::L33_5,
        Self::L34,
        Self::L34_5,
        Self::L35,
        Self::L37,
        Self::L40,
        Self::L43,
        Self::L44,
        Self::L45,
        Self::L47,
        Self::L50,
        Self::L53,
        Self::L57,
        Self::L60,
        Self::L67,
        Self::L70,
    ];

    pub fn value(self) -> f64 {
        match self {
            Self::L5 => 5.0,
            Self::L10 => 10.0,
            Self::L11 => 11.0,
            Self::L12 => 12.0,
            Self::L13 => 13.0,
            Self::L15 => 15.0,
            Self::L20 => 20.0,
            Self::L24 => 24.0,
            Self::L25 => 25.0,
            Self::L26 => 26.0,
            Self::L27 => 27.0,
            Self::L30 => 30.0,
            Self::L32 => 32.0,
            Self::L33 => 33.0,
            Self::L33_5 => 33.5,
            Self::L34 => 34.0,
            Self::L34_5 => 34.5,
            Self::L35 => 35.0,
            Self::L37 => 37.0,
            Self::L40 => 40.0,
            Self::L43 => 43.0,
            Self::L44 => 44.0,
            Self::L45 => 45.0,
            Self::L47 => 47.0,
            Self::L50 => 50.0,
            Self::L53 => 53.0,
            Self::L57 => 57.0,
            Self::L60 => 60.0,
            Self::L67 => 67.0,
            Self::L70 => 70.0,
        }
    }

    /// Column prefix in the wide table, e.g. `L30` or `L33_5`.
    pub fn column_prefix(self) -> &'static str {
        match self {
            Self::L5 => "L5",
            Self::L10 => "L10",
            Self::L11 => "L11",
            Self::L12 => "L12",
            Self::L13 => "L13",
            Self::L15 => "L15",
            Self::L20 => "L20",
            Self::L24 => "L24",
            Self::L25 => "L25",
            Self::L26 => "L26",
            Self::L27 => "L27",
            Self::L30 => "L30",
            Self::L32 => "L32",
            Self::L33 => "L33",
            Self::L33_5 => "L33_5",
            Self::L34 => "L34",
            Self::L34_5 => "L34_5",
            Self::L35 => "L35",
            Self::L37 => "L37",
            Self::L40 => "L40",
            Self::L43 => "L43",
            Self::L44 => "L44",
            Self::L45 => "L45",
            Self::L47 => "L47",
            Self::L50 => "L50",
            Self::L53 => "L53",
            Self::L57 => "L57",
            Self::L60 => "L60",
            Self::L67 => "L67",
            Self::L70 => "L70",
        }
    }

    /// Canonical rank name.
    pub fn label(self) -> &'static str {
        match self {
            Self::L5 => "subspecies",
            Self::L10 => "species",
            Self::L11 => "complex",
            Self::L12 => "subsection",
            Self::L13 => "section",
            Self::L15 => "subgenus",
            Self::L20 => "genus",
            Self::L24 => "subtribe",
            Self::L25 => "tribe",
            Self::L26 => "supertribe",
            Self::L27 => "subfamily",
            Self::L30 => "family",
            Self::L32 => "epifamily",
            Self::L33 => "superfamily",
            Self::L33_5 => "zoosubsection",
            Self::L34 => "zoosection",
            Self::L34_5 => "parvorder",
            Self::L35 => "infraorder",
            Self::L37 => "suborder",
            Self::L40 => "order",
            Self::L43 => "superorder",
            Self::L44 => "subterclass",
            Self::L45 => "infraclass",
            Self::L47 => "subclass",
            Self::L50 => "class",
            Self::L53 => "superclass",
            Self::L57 => "subphylum",
            Self::L60 => "phylum",
            Self::L67 => "subkingdom",
            Self::L70 => "kingdom",
        }
    }

    pub fn is_major(self) -> bool {
        MAJOR_RANKS.contains(&self)
    }

    /// Decode a stored rank value. Accepts `33.5` as well as the scaled `335`.
    pub fn from_value(value: f64) -> Option<Self> {
        let value = match value {
            v if v == 335.0 => 33.5,
            v if v == 345.0 => 34.5,
            v => v,
        };
        Self::ALL.iter().copied().find(|r| r.value() == value)
    }

    /// Ranks coarsest first (kingdom → subspecies).
    pub fn descending() -> impl Iterator<Item = RankLevel> {
        Self::ALL.iter().rev().copied()
    }
}

impl fmt::Display for RankLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<RankLevel> for f64 {
    fn from(rank: RankLevel) -> f64 {
        rank.value()
    }
}

impl TryFrom<f64> for RankLevel {
    type Error = TaxonomyError;

    fn try_from(value: f64) -> Result<Self> {
        Self::from_value(value).ok_or_else(|| TaxonomyError::UnknownRank(value.to_string()))
    }
}

impl FromStr for RankLevel {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self> {
        infer_rank(s)
    }
}

pub fn is_major(rank: RankLevel) -> bool {
    rank.is_major()
}

/// Map a rank label (name, abbreviation, column prefix or numeric value) to
/// a [`RankLevel`], case-insensitively.
pub fn infer_rank(label: &str) -> Result<RankLevel> {
    let norm = label.trim().to_lowercase();
    let rank = match norm.as_str() {
        "subspecies" | "ssp" | "subsp" | "variety" | "var" | "form" | "hybrid" => {
            Some(RankLevel::L5)
        }
        "species" | "sp" | "spp" => Some(RankLevel::L10),
        "complex" => Some(RankLevel::L11),
        "subsection" => Some(RankLevel::L12),
        "section" => Some(RankLevel::L13),
        "subgenus" => Some(RankLevel::L15),
        "genus" | "gen" => Some(RankLevel::L20),
        "subtribe" => Some(RankLevel::L24),
        "tribe" => Some(RankLevel::L25),
        "supertribe" => Some(RankLevel::L26),
        "subfamily" | "subfam" => Some(RankLevel::L27),
        "family" | "fam" => Some(RankLevel::L30),
        "epifamily" => Some(RankLevel::L32),
        "superfamily" | "superfam" => Some(RankLevel::L33),
        "zoosubsection" => Some(RankLevel::L33_5),
        "zoosection" => Some(RankLevel::L34),
        "parvorder" => Some(RankLevel::L34_5),
        "infraorder" => Some(RankLevel::L35),
        "suborder" => Some(RankLevel::L37),
        "order" | "ord" => Some(RankLevel::L40),
        "superorder" => Some(RankLevel::L43),
        "subterclass" => Some(RankLevel::L44),
        "infraclass" => Some(RankLevel::L45),
        "subclass" => Some(RankLevel::L47),
        "class" | "cls" => Some(RankLevel::L50),
        "superclass" => Some(RankLevel::L53),
        "subphylum" => Some(RankLevel::L57),
        "phylum" | "phy" | "division" => Some(RankLevel::L60),
        "subkingdom" => Some(RankLevel::L67),
        "kingdom" | "kgdm" => Some(RankLevel::L70),
        other => RankLevel::ALL
            .iter()
            .copied()
            .find(|r| r.column_prefix().eq_ignore_ascii_case(other))
            .or_else(|| other.parse::<f64>().ok().and_then(RankLevel::from_value)),
    };
    rank.ok_or_else(|| TaxonomyError::UnknownRank(label.to_string()))
}
