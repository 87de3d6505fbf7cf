//! Ancestry trail summaries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::lineage::ancestry_pairs;
use crate::rank::RankLevel;
use crate::row::ExpandedRow;
use crate::taxon::Taxon;
use crate::TaxonId;

pub const DEFAULT_TRAIL_SEPARATOR: &str = " \u{2192} ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonTrailNode {
    pub rank_level: RankLevel,
    pub taxon_id: TaxonId,
    pub scientific_name: String,
    pub vernacular_name: Option<String>,
}

/// A focal taxon plus its lineage, root first. The focal node is always the
/// last element of `trail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonSummary {
    pub taxon_id: TaxonId,
    pub scientific_name: String,
    pub vernacular_name: Option<String>,
    pub rank_level: RankLevel,
    pub trail: Vec<TaxonTrailNode>,
}

impl TaxonSummary {
    /// `Insecta → Hymenoptera → Apidae`, optionally with `(common name)`
    /// after each node that has one.
    pub fn format_trail(&self, separator: &str, include_vernacular: bool) -> String {
        self.trail
            .iter()
            .map(|node| match (&node.vernacular_name, include_vernacular) {
                (Some(v), true) => format!("{} ({v})", node.scientific_name),
                _ => node.scientific_name.clone(),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }
}

#[derive(Debug, Clone)]
struct PendingNode {
    rank_level: RankLevel,
    taxon_id: TaxonId,
    scientific_name: Option<String>,
    vernacular_name: Option<String>,
}

/// Trail built from one wide row whose ancestor names may still be missing.
#[derive(Debug, Clone)]
pub struct PendingSummary {
    focal: PendingNode,
    trail: Vec<PendingNode>,
}

/// Start a summary from the focal row. Names come from the `L*_name` columns;
/// call [`PendingSummary::missing_ids`] and [`PendingSummary::finish`] to fill
/// the gaps.
pub fn summarize(row: &ExpandedRow, major_ranks_only: bool) -> PendingSummary {
    let focal = PendingNode {
        rank_level: row.rank_level,
        taxon_id: row.id,
        scientific_name: Some(row.name.clone()),
        vernacular_name: row.common_name.clone(),
    };

    let mut trail: Vec<PendingNode> = ancestry_pairs(row)
        .into_iter()
        .filter(|(id, rank)| !major_ranks_only || rank.is_major() || *id == row.id)
        .map(|(id, rank)| {
            if id == row.id {
                return focal.clone();
            }
            let stored = row.ranks.get(&rank);
            PendingNode {
                rank_level: rank,
                taxon_id: id,
                scientific_name: stored.and_then(|a| a.name.clone()),
                vernacular_name: stored.and_then(|a| a.common_name.clone()),
            }
        })
        .collect();
    if trail.last().map(|n| n.taxon_id) != Some(row.id) {
        trail.push(focal.clone());
    }

    PendingSummary { focal, trail }
}

impl PendingSummary {
    /// Trail ids with no stored scientific name.
    pub fn missing_ids(&self) -> Vec<TaxonId> {
        self.trail
            .iter()
            .filter(|n| n.scientific_name.is_none())
            .map(|n| n.taxon_id)
            .collect()
    }

    /// Fill missing names from `resolved`; anything still unknown is rendered
    /// as its id.
    pub fn finish(self, resolved: &HashMap<TaxonId, Taxon>) -> TaxonSummary {
        let trail = self
            .trail
            .into_iter()
            .map(|node| {
                let (scientific_name, vernacular_name) = match node.scientific_name {
                    Some(name) => (name, node.vernacular_name),
                    None => match resolved.get(&node.taxon_id) {
                        Some(t) => (
                            t.scientific_name.clone(),
                            node.vernacular_name
                                .or_else(|| t.common_name().map(str::to_string)),
                        ),
                        None => {
                            warn!(taxon_id = node.taxon_id, "trail name unresolved, using id");
                            (node.taxon_id.to_string(), node.vernacular_name)
                        }
                    },
                };
                TaxonTrailNode {
                    rank_level: node.rank_level,
                    taxon_id: node.taxon_id,
                    scientific_name,
                    vernacular_name,
                }
            })
            .collect();

        TaxonSummary {
            taxon_id: self.focal.taxon_id,
            scientific_name: self.focal.scientific_name.unwrap_or_default(),
            vernacular_name: self.focal.vernacular_name,
            rank_level: self.focal.rank_level,
            trail,
        }
    }
}
