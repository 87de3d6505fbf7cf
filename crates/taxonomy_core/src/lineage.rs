//! Backend-agnostic tree algorithms over wide rows.
//!
//! Everything here is synchronous and pure (or takes a lookup closure), so
//! both backends produce identical answers from identical rows.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{Result, TaxonomyError};
use crate::rank::{RankLevel, MAJOR_RANKS};
use crate::row::ExpandedRow;
use crate::TaxonId;

/// Root → self `(id, rank)` pairs taken from the rank columns plus the row
/// itself, first occurrence kept.
pub fn ancestry_pairs(row: &ExpandedRow) -> Vec<(TaxonId, RankLevel)> {
    if !row.has_rank_columns {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    RankLevel::descending()
        .filter_map(|rank| row.ancestor_at(rank).map(|id| (id, rank)))
        .chain(std::iter::once((row.id, row.rank_level)))
        .filter(|(id, _)| seen.insert(*id))
        .collect()
}

/// Root → self ids. With `include_minor_ranks = false` every non-major pair is
/// dropped except the row's own.
pub fn ancestry_ids(row: &ExpandedRow, include_minor_ranks: bool) -> Vec<TaxonId> {
    ancestry_pairs(row)
        .into_iter()
        .filter(|(id, rank)| include_minor_ranks || rank.is_major() || *id == row.id)
        .map(|(id, _)| id)
        .collect()
}

/// Longest root-aligned prefix shared by every ancestry.
pub fn common_prefix<'a, I>(ancestries: I) -> Vec<TaxonId>
where
    I: IntoIterator<Item = &'a [TaxonId]>,
{
    let mut iter = ancestries.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let mut len = first.len();
    for other in iter {
        len = first
            .iter()
            .zip(other.iter())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();
    }
    first[..len].to_vec()
}

/// Minor-inclusive LCA: last id of the common prefix.
pub fn lca_from_ancestries(ancestries: &[Vec<TaxonId>]) -> Result<TaxonId> {
    common_prefix(ancestries.iter().map(Vec::as_slice))
        .last()
        .copied()
        .ok_or_else(|| {
            TaxonomyError::InvalidArgument("taxa share no common ancestry prefix".into())
        })
}

/// Major-only fast path: the finest major rank at which every row carries the
/// same ancestor id. `None` means the columns are too sparse to decide.
pub fn lca_from_rank_columns(rows: &[ExpandedRow]) -> Option<TaxonId> {
    if rows.is_empty() {
        return None;
    }
    MAJOR_RANKS.iter().find_map(|rank| {
        let mut ids = rows.iter().map(|r| r.ancestor_at(*rank));
        let first = ids.next()??;
        ids.all(|id| id == Some(first)).then_some(first)
    })
}

/// LCA answered from the wide columns alone. Minor-inclusive takes the
/// common prefix of full ancestries, which needs every row's lineage filled
/// in. `None` sends the caller to [`lca_by_walk`].
pub fn lca_from_columns(rows: &[ExpandedRow], include_minor_ranks: bool) -> Option<TaxonId> {
    if !include_minor_ranks {
        return lca_from_rank_columns(rows);
    }
    if rows.is_empty() || !rows.iter().all(ExpandedRow::has_lineage) {
        return None;
    }
    let ancestries: Vec<Vec<TaxonId>> = rows.iter().map(|r| ancestry_ids(r, true)).collect();
    lca_from_ancestries(&ancestries).ok()
}

/// Graph-walk LCA. Every start id climbs one hop per round via `parent_of`;
/// the first id reached by every branch wins, ties broken by the smallest
/// total step count. `Ok(None)` if the branches never meet.
pub fn lca_by_walk<F>(start: &[TaxonId], mut parent_of: F) -> Result<Option<TaxonId>>
where
    F: FnMut(TaxonId) -> Result<Option<TaxonId>>,
{
    let branches = start.len();
    if branches == 0 {
        return Ok(None);
    }

    // id -> (branches that reached it, summed steps)
    let mut reached: HashMap<TaxonId, (HashSet<usize>, u64)> = HashMap::new();
    let mut frontier: Vec<Option<TaxonId>> = start.iter().copied().map(Some).collect();
    let mut visited: Vec<HashSet<TaxonId>> = vec![HashSet::new(); branches];
    let mut step = 0u64;

    loop {
        for (branch, node) in frontier.iter().enumerate() {
            if let Some(id) = node {
                let entry = reached.entry(*id).or_insert_with(|| (HashSet::new(), 0));
                if entry.0.insert(branch) {
                    entry.1 += step;
                }
            }
        }

        let best = reached
            .iter()
            .filter(|(_, (hit, _))| hit.len() == branches)
            .min_by_key(|(id, (_, steps))| (*steps, **id))
            .map(|(id, _)| *id);
        if best.is_some() {
            debug!(?start, lca = ?best, rounds = step, "graph walk converged");
            return Ok(best);
        }

        let mut moved = false;
        for (branch, node) in frontier.iter_mut().enumerate() {
            let Some(id) = *node else { continue };
            visited[branch].insert(id);
            *node = match parent_of(id)? {
                Some(parent) if !visited[branch].contains(&parent) => {
                    moved = true;
                    Some(parent)
                }
                _ => None,
            };
        }
        if !moved {
            return Ok(None);
        }
        step += 1;
    }
}

/// Edge count between two ancestries through their deepest shared node.
pub fn distance_between(a: &[TaxonId], b: &[TaxonId], inclusive: bool) -> u32 {
    let shared = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let edges = (a.len() - shared) + (b.len() - shared);
    edges as u32 + u32::from(inclusive)
}
