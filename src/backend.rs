use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tracing::info;

use taxonomy_core::{
    Children, Result, SearchHit, SearchRequest, Taxon, TaxonId, TaxonSummary, TaxonomyService,
};
use taxonomy_postgres::PgTaxonomyService;
use taxonomy_sqlite::{SqliteTaxonomyService, WorkerPool};

use crate::config::{BackendConfig, ConfigError, TaxonomyConfig};

/// The configured store. Answers are identical whichever variant is active.
#[derive(Clone)]
pub enum Backend {
    Local(SqliteTaxonomyService),
    Remote(PgTaxonomyService),
}

impl Backend {
    /// Build the backend named by `config`. Must run inside a tokio runtime.
    pub async fn connect(config: &TaxonomyConfig) -> std::result::Result<Self, ConfigError> {
        let backend = match &config.backend {
            BackendConfig::Sqlite { path, workers } => {
                let pool = WorkerPool::current(*workers)?;
                Backend::Local(SqliteTaxonomyService::open(path, pool)?)
            }
            BackendConfig::Postgres(settings) => {
                let pg = settings.pg_config()?;
                Backend::Remote(PgTaxonomyService::connect(&pg).await?)
            }
        };
        info!(backend = backend.kind(), "taxonomy backend ready");
        Ok(backend)
    }

    /// `TaxonomyConfig::from_env` followed by [`Backend::connect`].
    pub async fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::connect(&TaxonomyConfig::from_env()?).await
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Local(_) => "sqlite",
            Backend::Remote(_) => "postgres",
        }
    }

    fn inner(&self) -> &dyn TaxonomyService {
        match self {
            Backend::Local(svc) => svc,
            Backend::Remote(svc) => svc,
        }
    }
}

impl From<SqliteTaxonomyService> for Backend {
    fn from(svc: SqliteTaxonomyService) -> Self {
        Backend::Local(svc)
    }
}

impl From<PgTaxonomyService> for Backend {
    fn from(svc: PgTaxonomyService) -> Self {
        Backend::Remote(svc)
    }
}

#[async_trait]
impl TaxonomyService for Backend {
    async fn get_taxon(&self, id: TaxonId) -> Result<Taxon> {
        self.inner().get_taxon(id).await
    }

    async fn children(&self, id: TaxonId, depth: u32) -> Result<Children> {
        self.inner().children(id, depth).await
    }

    async fn children_list(&self, id: TaxonId, depth: u32) -> Result<Vec<Taxon>> {
        self.inner().children_list(id, depth).await
    }

    async fn lca(&self, ids: &BTreeSet<TaxonId>, include_minor_ranks: bool) -> Result<Taxon> {
        self.inner().lca(ids, include_minor_ranks).await
    }

    async fn distance(
        &self,
        a: TaxonId,
        b: TaxonId,
        include_minor_ranks: bool,
        inclusive: bool,
    ) -> Result<u32> {
        self.inner()
            .distance(a, b, include_minor_ranks, inclusive)
            .await
    }

    async fn ancestors(&self, id: TaxonId, include_minor_ranks: bool) -> Result<Vec<TaxonId>> {
        self.inner().ancestors(id, include_minor_ranks).await
    }

    async fn subtree(
        &self,
        root_ids: &BTreeSet<TaxonId>,
    ) -> Result<BTreeMap<TaxonId, Option<TaxonId>>> {
        self.inner().subtree(root_ids).await
    }

    async fn search_taxa(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.inner().search_taxa(request).await
    }

    async fn taxon_summary(&self, id: TaxonId, major_ranks_only: bool) -> Result<TaxonSummary> {
        self.inner().taxon_summary(id, major_ranks_only).await
    }
}
