//! The hierarchy service port and its convenience layer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;

use crate::cursor::Children;
use crate::error::Result;
use crate::pollinator::{groups_for_ancestry, PollinatorGroup};
use crate::search::{SearchHit, SearchRequest};
use crate::summary::TaxonSummary;
use crate::taxon::Taxon;
use crate::TaxonId;

/// Read-only structural queries over a taxonomy tree.
///
/// Implementations differ in how they execute, never in what they answer.
#[async_trait]
pub trait TaxonomyService: Send + Sync {
    async fn get_taxon(&self, id: TaxonId) -> Result<Taxon>;

    /// Descendants within `depth` hops. `depth == 0` yields nothing.
    async fn children(&self, id: TaxonId, depth: u32) -> Result<Children>;

    /// Same members as [`children`](Self::children), ordered by hop
    /// distance then id.
    async fn children_list(&self, id: TaxonId, depth: u32) -> Result<Vec<Taxon>>;

    async fn lca(&self, ids: &BTreeSet<TaxonId>, include_minor_ranks: bool) -> Result<Taxon>;

    async fn distance(
        &self,
        a: TaxonId,
        b: TaxonId,
        include_minor_ranks: bool,
        inclusive: bool,
    ) -> Result<u32>;

    /// Root → self ids.
    async fn ancestors(&self, id: TaxonId, include_minor_ranks: bool) -> Result<Vec<TaxonId>>;

    /// Every taxon under `root_ids` mapped to its parent; roots map to `None`.
    async fn subtree(
        &self,
        root_ids: &BTreeSet<TaxonId>,
    ) -> Result<BTreeMap<TaxonId, Option<TaxonId>>>;

    async fn search_taxa(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;

    async fn taxon_summary(&self, id: TaxonId, major_ranks_only: bool) -> Result<TaxonSummary>;
}

/// Helpers built purely on [`TaxonomyService`].
#[async_trait]
pub trait TaxonomyServiceExt: TaxonomyService {
    /// Lookups in the given order. The first failure aborts the batch.
    async fn get_many(&self, ids: &[TaxonId]) -> Result<Vec<Taxon>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.get_taxon(*id).await?);
        }
        Ok(out)
    }

    /// Keyed lookups, run concurrently. All-or-nothing.
    async fn get_many_batched(&self, ids: &[TaxonId]) -> Result<HashMap<TaxonId, Taxon>> {
        let unique: BTreeSet<TaxonId> = ids.iter().copied().collect();
        let taxa = futures::future::try_join_all(unique.into_iter().map(|id| self.get_taxon(id)))
            .await?;
        Ok(taxa.into_iter().map(|t| (t.id, t)).collect())
    }

    async fn pollinator_groups_for_taxon(&self, id: TaxonId) -> Result<BTreeSet<PollinatorGroup>> {
        let ancestry = self.ancestors(id, true).await?;
        Ok(groups_for_ancestry(&ancestry))
    }
}

impl<T: TaxonomyService + ?Sized> TaxonomyServiceExt for T {}
