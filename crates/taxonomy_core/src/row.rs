//! Expanded ("wide") row schema and the storage-boundary parser.
//!
//! Backends turn a driver row into a [`RawRow`] without interpreting it, then
//! call [`ExpandedRow::parse`]. Alternative column spellings are resolved here
//! and nowhere else.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, TaxonomyError};
use crate::lineage;
use crate::rank::RankLevel;
use crate::taxon::Taxon;
use crate::TaxonId;

pub const TABLE: &str = "expanded_taxa";

pub const COL_ID: &str = "taxonID";
pub const COL_NAME: &str = "name";
pub const COL_RANK: &str = "rankLevel";
pub const COL_COMMON: &str = "commonName";
pub const COL_ACTIVE: &str = "taxonActive";
pub const COL_PARENT: &str = "immediateAncestor_taxonID";
pub const COL_PARENT_RANK: &str = "immediateAncestor_rankLevel";
pub const COL_MAJOR_PARENT: &str = "immediateMajorAncestor_taxonID";
pub const COL_MAJOR_PARENT_RANK: &str = "immediateMajorAncestor_rankLevel";

const ID_KEYS: &[&str] = &["taxonID", "taxonId", "taxon_id", "id"];
const NAME_KEYS: &[&str] = &["name", "scientificName", "scientific_name"];
const RANK_KEYS: &[&str] = &["rankLevel", "rank_level"];
const PARENT_KEYS: &[&str] = &[
    "immediateAncestor_taxonID",
    "immediateAncestorId",
    "parentId",
    "parent_id",
];
const COMMON_KEYS: &[&str] = &["commonName", "common_name", "vernacularName", "vernacular"];

/// `"L30_taxonID"` for family.
pub fn rank_id_column(rank: RankLevel) -> String {
    format!("{}_taxonID", rank.column_prefix())
}

pub fn rank_name_column(rank: RankLevel) -> String {
    format!("{}_name", rank.column_prefix())
}

pub fn rank_common_column(rank: RankLevel) -> String {
    format!("{}_commonName", rank.column_prefix())
}

/// One untyped storage value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Int(v) => Some(v.to_string()),
            Cell::Float(v) => Some(v.to_string()),
            Cell::Bool(v) => Some(v.to_string()),
            Cell::Null => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(v) => Some(*v),
            Cell::Int(v) => Some(*v != 0),
            Cell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" => Some(true),
                "f" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A storage row keyed by column name, as produced by a backend driver.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: HashMap<String, Cell>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, cell: Cell) {
        self.cells.insert(column.into(), cell);
    }

    pub fn with(mut self, column: impl Into<String>, cell: Cell) -> Self {
        self.insert(column, cell);
        self
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// First non-null cell among alternative spellings.
    fn first(&self, keys: &[&str]) -> Option<&Cell> {
        keys.iter()
            .filter_map(|k| self.cells.get(*k))
            .find(|c| **c != Cell::Null)
    }

    fn id(&self, keys: &[&str], field: &str) -> Result<Option<TaxonId>> {
        match self.first(keys) {
            None => Ok(None),
            Some(cell) => cell.as_i64().map(Some).ok_or_else(|| {
                TaxonomyError::MissingField(format!("{field} (not an integer: {cell:?})"))
            }),
        }
    }

    fn rank(&self, keys: &[&str]) -> Result<Option<RankLevel>> {
        match self.first(keys) {
            None => Ok(None),
            Some(cell) => {
                let value = cell
                    .as_f64()
                    .ok_or_else(|| TaxonomyError::UnknownRank(format!("{cell:?}")))?;
                RankLevel::try_from(value).map(Some)
            }
        }
    }
}

/// Ancestor reference stored in a rank triple.
#[derive(Debug, Clone, PartialEq)]
pub struct RankAncestor {
    pub id: TaxonId,
    pub name: Option<String>,
    pub common_name: Option<String>,
}

/// Canonical parsed form of one `expanded_taxa` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedRow {
    pub id: TaxonId,
    pub name: String,
    pub rank_level: RankLevel,
    pub common_name: Option<String>,
    pub active: bool,
    pub immediate_ancestor: Option<(TaxonId, Option<RankLevel>)>,
    pub immediate_major_ancestor: Option<(TaxonId, Option<RankLevel>)>,
    pub ranks: BTreeMap<RankLevel, RankAncestor>,
    /// False for minimal/legacy rows that carry no `L*_taxonID` column at all.
    pub has_rank_columns: bool,
}

impl ExpandedRow {
    pub fn parse(raw: &RawRow) -> Result<Self> {
        let id = raw
            .id(ID_KEYS, "id")?
            .ok_or_else(|| TaxonomyError::MissingField("id".into()))?;
        let name = raw
            .first(NAME_KEYS)
            .and_then(Cell::as_text)
            .ok_or_else(|| TaxonomyError::MissingField("name".into()))?;
        let rank_level = raw
            .rank(RANK_KEYS)?
            .ok_or_else(|| TaxonomyError::MissingField("rank_level".into()))?;
        let common_name = raw.first(COMMON_KEYS).and_then(Cell::as_text);
        let active = raw
            .first(&[COL_ACTIVE])
            .and_then(Cell::as_bool)
            .unwrap_or(true);

        let immediate_ancestor = raw
            .id(PARENT_KEYS, "parent_id")?
            .map(|pid| Ok::<_, TaxonomyError>((pid, raw.rank(&[COL_PARENT_RANK])?)))
            .transpose()?;
        let immediate_major_ancestor = raw
            .id(&[COL_MAJOR_PARENT], "immediate_major_ancestor")?
            .map(|pid| Ok::<_, TaxonomyError>((pid, raw.rank(&[COL_MAJOR_PARENT_RANK])?)))
            .transpose()?;

        let mut ranks = BTreeMap::new();
        let mut has_rank_columns = false;
        for rank in RankLevel::ALL {
            let id_col = rank_id_column(rank);
            if raw.contains(&id_col) {
                has_rank_columns = true;
            }
            let Some(ancestor_id) = raw.id(&[id_col.as_str()], &id_col)? else {
                continue;
            };
            // A triple may name the taxon itself at its own rank, never something finer.
            if rank < rank_level {
                continue;
            }
            ranks.insert(
                rank,
                RankAncestor {
                    id: ancestor_id,
                    name: raw
                        .first(&[rank_name_column(rank).as_str()])
                        .and_then(Cell::as_text),
                    common_name: raw
                        .first(&[rank_common_column(rank).as_str()])
                        .and_then(Cell::as_text),
                },
            );
        }

        Ok(Self {
            id,
            name,
            rank_level,
            common_name,
            active,
            immediate_ancestor,
            immediate_major_ancestor,
            ranks,
            has_rank_columns,
        })
    }

    pub fn parent_id(&self) -> Option<TaxonId> {
        self.immediate_ancestor.map(|(id, _)| id)
    }

    /// Next hop for a major-aware upward walk.
    pub fn major_step(&self) -> Option<TaxonId> {
        self.immediate_major_ancestor
            .or(self.immediate_ancestor)
            .map(|(id, _)| id)
    }

    pub fn ancestor_at(&self, rank: RankLevel) -> Option<TaxonId> {
        self.ranks.get(&rank).map(|a| a.id)
    }

    /// True when at least one rank triple is filled in. Columns that exist
    /// but are all null do not count.
    pub fn has_lineage(&self) -> bool {
        !self.ranks.is_empty()
    }

    /// Normalize into a [`Taxon`] with its minor-inclusive ancestry.
    pub fn to_taxon(&self) -> Taxon {
        Taxon::new(
            self.id,
            self.name.clone(),
            self.rank_level,
            self.parent_id(),
            lineage::ancestry_ids(self, true),
            self.common_name.clone(),
        )
    }
}
