use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use taxonomy_core::search::rank_hits;
use taxonomy_core::{
    Children, Result, SearchHit, SearchRequest, Taxon, TaxonId, TaxonSummary, TaxonomyError,
    TaxonomyService,
};

use crate::connections::ConnectionStack;
use crate::pool::WorkerPool;
use crate::queries;

/// Local-store backend over a read-only `expanded_taxa` SQLite file.
///
/// Cheap to clone; clones share the worker pool and idle connections.
#[derive(Clone)]
pub struct SqliteTaxonomyService {
    pool: WorkerPool,
    connections: Arc<ConnectionStack>,
}

impl SqliteTaxonomyService {
    /// Open `path` read-only. Fails fast if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, pool: WorkerPool) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;

        let first = Connection::open_with_flags(&path, flags)
            .map_err(|e| TaxonomyError::unavailable(&format!("open {}", path.display()), e))?;
        info!(path = %path.display(), workers = pool.size(), "opened sqlite taxonomy store");

        let service = Self::from_connection_factory(
            move || Connection::open_with_flags(&path, flags),
            pool,
        );
        service.connections.adopt(first)?;
        Ok(service)
    }

    /// Build over any connection source, e.g. a shared in-memory database.
    pub fn from_connection_factory<F>(factory: F, pool: WorkerPool) -> Self
    where
        F: Fn() -> rusqlite::Result<Connection> + Send + Sync + 'static,
    {
        Self {
            pool,
            connections: Arc::new(ConnectionStack::new(Arc::new(factory))),
        }
    }

    pub fn idle_connections(&self) -> usize {
        self.connections.idle_count()
    }

    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connections = Arc::clone(&self.connections);
        self.pool
            .run(move || connections.with_connection(job))
            .await
    }
}

#[async_trait]
impl TaxonomyService for SqliteTaxonomyService {
    async fn get_taxon(&self, id: TaxonId) -> Result<Taxon> {
        debug!(taxon_id = id, "sqlite get_taxon");
        self.run(move |conn| Ok(queries::require_row(conn, id)?.to_taxon()))
            .await
    }

    async fn children(&self, id: TaxonId, depth: u32) -> Result<Children> {
        Ok(Children::ready(self.children_list(id, depth).await?))
    }

    async fn children_list(&self, id: TaxonId, depth: u32) -> Result<Vec<Taxon>> {
        self.run(move |conn| queries::children(conn, id, depth)).await
    }

    async fn lca(&self, ids: &BTreeSet<TaxonId>, include_minor_ranks: bool) -> Result<Taxon> {
        if ids.is_empty() {
            return Err(TaxonomyError::InvalidArgument(
                "lca needs at least one taxon id".into(),
            ));
        }
        let ids = ids.clone();
        self.run(move |conn| queries::lca(conn, &ids, include_minor_ranks))
            .await
    }

    async fn distance(
        &self,
        a: TaxonId,
        b: TaxonId,
        include_minor_ranks: bool,
        inclusive: bool,
    ) -> Result<u32> {
        if a == b {
            return Ok(0);
        }
        self.run(move |conn| queries::distance(conn, a, b, include_minor_ranks, inclusive))
            .await
    }

    async fn ancestors(&self, id: TaxonId, include_minor_ranks: bool) -> Result<Vec<TaxonId>> {
        self.run(move |conn| queries::ancestors(conn, id, include_minor_ranks))
            .await
    }

    async fn subtree(
        &self,
        root_ids: &BTreeSet<TaxonId>,
    ) -> Result<BTreeMap<TaxonId, Option<TaxonId>>> {
        if root_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let roots = root_ids.clone();
        self.run(move |conn| queries::subtree(conn, &roots)).await
    }

    async fn search_taxa(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let Some(plan) = request.plan()? else {
            return Ok(Vec::new());
        };
        let candidates = self
            .run(move |conn| {
                for mode in plan.attempts {
                    let rows = queries::search(conn, &plan, *mode)?;
                    if !rows.is_empty() {
                        return Ok(rows);
                    }
                }
                Ok(Vec::new())
            })
            .await?;
        Ok(rank_hits(request, candidates))
    }

    async fn taxon_summary(&self, id: TaxonId, major_ranks_only: bool) -> Result<TaxonSummary> {
        self.run(move |conn| queries::summary(conn, id, major_ranks_only))
            .await
    }
}
