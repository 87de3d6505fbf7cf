//! In-memory service over the synthetic tree, for unit tests of the helper
//! layer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::cursor::Children;
use crate::error::{Result, TaxonomyError};
use crate::lineage::{ancestry_ids, distance_between, lca_from_ancestries};
use crate::row::{Cell, ExpandedRow, RawRow};
use crate::search::{rank_hits, SearchHit, SearchRequest};
use crate::service::TaxonomyService;
use crate::summary::{summarize, TaxonSummary};
use crate::taxon::Taxon;
use crate::TaxonId;

pub(crate) fn row(id: i64, rank: i64, parent: Option<i64>, cols: &[(i64, i64)]) -> ExpandedRow {
    let mut raw = RawRow::new()
        .with("taxonID", Cell::Int(id))
        .with("name", Cell::Text(format!("tax{id}")))
        .with("rankLevel", Cell::Int(rank))
        .with(
            "immediateAncestor_taxonID",
            parent.map(Cell::Int).unwrap_or(Cell::Null),
        );
    for (level, ancestor) in cols {
        raw.insert(format!("L{level}_taxonID"), Cell::Int(*ancestor));
    }
    ExpandedRow::parse(&raw).unwrap()
}

/// 1@70 → 2@60 → {3@40, 4@40}; 5@10 under 3, 6@10 under 4.
pub(crate) struct MemoryService {
    rows: HashMap<TaxonId, ExpandedRow>,
    pub lookups: AtomicUsize,
}

impl MemoryService {
    pub fn synthetic() -> Self {
        let rows = [
            row(1, 70, None, &[(70, 1)]),
            row(2, 60, Some(1), &[(70, 1), (60, 2)]),
            row(3, 40, Some(2), &[(70, 1), (60, 2), (40, 3)]),
            row(4, 40, Some(2), &[(70, 1), (60, 2), (40, 4)]),
            row(5, 10, Some(3), &[(70, 1), (60, 2), (40, 3), (10, 5)]),
            row(6, 10, Some(4), &[(70, 1), (60, 2), (40, 4), (10, 6)]),
        ];
        Self {
            rows: rows.into_iter().map(|r| (r.id, r)).collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn row(&self, id: TaxonId) -> Result<&ExpandedRow> {
        self.rows.get(&id).ok_or(TaxonomyError::NotFound(id))
    }
}

#[async_trait]
impl TaxonomyService for MemoryService {
    async fn get_taxon(&self, id: TaxonId) -> Result<Taxon> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.row(id)?.to_taxon())
    }

    async fn children(&self, id: TaxonId, depth: u32) -> Result<Children> {
        Ok(Children::ready(self.children_list(id, depth).await?))
    }

    async fn children_list(&self, id: TaxonId, depth: u32) -> Result<Vec<Taxon>> {
        let mut out = Vec::new();
        let mut frontier = vec![id];
        for _ in 0..depth {
            let mut next: Vec<&ExpandedRow> = self
                .rows
                .values()
                .filter(|r| r.parent_id().is_some_and(|p| frontier.contains(&p)))
                .collect();
            next.sort_by_key(|r| r.id);
            frontier = next.iter().map(|r| r.id).collect();
            out.extend(next.into_iter().map(ExpandedRow::to_taxon));
        }
        Ok(out)
    }

    async fn lca(&self, ids: &BTreeSet<TaxonId>, include_minor_ranks: bool) -> Result<Taxon> {
        let ancestries = ids
            .iter()
            .map(|id| Ok(ancestry_ids(self.row(*id)?, include_minor_ranks)))
            .collect::<Result<Vec<_>>>()?;
        self.get_taxon(lca_from_ancestries(&ancestries)?).await
    }

    async fn distance(
        &self,
        a: TaxonId,
        b: TaxonId,
        include_minor_ranks: bool,
        inclusive: bool,
    ) -> Result<u32> {
        let a = ancestry_ids(self.row(a)?, include_minor_ranks);
        let b = ancestry_ids(self.row(b)?, include_minor_ranks);
        Ok(distance_between(&a, &b, inclusive))
    }

    async fn ancestors(&self, id: TaxonId, include_minor_ranks: bool) -> Result<Vec<TaxonId>> {
        Ok(ancestry_ids(self.row(id)?, include_minor_ranks))
    }

    async fn subtree(
        &self,
        root_ids: &BTreeSet<TaxonId>,
    ) -> Result<BTreeMap<TaxonId, Option<TaxonId>>> {
        let mut out = BTreeMap::new();
        for root in root_ids.iter().filter(|id| self.rows.contains_key(id)) {
            out.insert(*root, None);
            for t in self.children_list(*root, 64).await? {
                out.entry(t.id).or_insert(t.parent_id);
            }
        }
        Ok(out)
    }

    async fn search_taxa(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let Some(plan) = request.plan()? else {
            return Ok(Vec::new());
        };
        let candidates = self
            .rows
            .values()
            .filter(|r| r.name.to_lowercase().contains(&plan.query))
            .map(ExpandedRow::to_taxon)
            .collect();
        Ok(rank_hits(request, candidates))
    }

    async fn taxon_summary(&self, id: TaxonId, major_ranks_only: bool) -> Result<TaxonSummary> {
        Ok(summarize(self.row(id)?, major_ranks_only).finish(&HashMap::new()))
    }
}
