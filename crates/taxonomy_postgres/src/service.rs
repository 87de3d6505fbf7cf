//! Postgres implementation of [`TaxonomyService`].
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so the
//! crate builds without a database.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use futures::FutureExt;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

use taxonomy_core::lineage::{ancestry_ids, distance_between, lca_from_columns};
use taxonomy_core::row::{
    COL_ACTIVE, COL_ID, COL_MAJOR_PARENT, COL_NAME, COL_PARENT, COL_RANK, TABLE,
};
use taxonomy_core::search::{rank_hits, MatchMode, SearchPlan};
use taxonomy_core::summary::summarize;
use taxonomy_core::{
    Children, ExpandedRow, Result, SearchHit, SearchRequest, Taxon, TaxonId, TaxonSummary,
    TaxonomyError, TaxonomyService,
};

use crate::config::PgConfig;
use crate::decode;

fn db_err(context: &'static str) -> impl Fn(sqlx::Error) -> TaxonomyError {
    move |e| TaxonomyError::unavailable(context, e)
}

// ── SQL ──────────────────────────────────────────────────────────────────

fn row_by_id_sql() -> String {
    format!(r#"SELECT * FROM {TABLE} WHERE "{COL_ID}" = $1"#)
}

fn rows_by_ids_sql() -> String {
    format!(r#"SELECT * FROM {TABLE} WHERE "{COL_ID}" = ANY($1)"#)
}

/// Descendants within `$2` hops of `$1`, each at its shallowest depth,
/// ordered by (depth, id).
fn children_sql() -> String {
    format!(
        r#"
        WITH RECURSIVE sub AS (
            SELECT t.*, 0 AS lvl FROM {TABLE} t WHERE t."{COL_ID}" = $1
            UNION ALL
            SELECT et.*, sub.lvl + 1 FROM {TABLE} et
              JOIN sub ON et."{COL_PARENT}" = sub."{COL_ID}"
            WHERE sub.lvl < $2
        )
        SELECT * FROM (
            SELECT DISTINCT ON ("{COL_ID}") * FROM sub
            WHERE lvl > 0
            ORDER BY "{COL_ID}", lvl
        ) d
        ORDER BY lvl, "{COL_ID}"
        "#
    )
}

fn subtree_sql() -> String {
    format!(
        r#"
        WITH RECURSIVE sub AS (
            SELECT "{COL_ID}"::bigint AS taxon_id, NULL::bigint AS parent_id
              FROM {TABLE} WHERE "{COL_ID}" = ANY($1)
            UNION
            SELECT et."{COL_ID}"::bigint, et."{COL_PARENT}"::bigint
              FROM {TABLE} et
              JOIN sub ON et."{COL_PARENT}" = sub.taxon_id
        )
        SELECT taxon_id, parent_id FROM sub
        "#
    )
}

/// Every start id climbs its step column; the shared node with the smallest
/// total climb wins. `$1` start ids, `$2` their count.
fn lca_walk_sql(include_minor_ranks: bool) -> String {
    let step = |alias: &str| {
        if include_minor_ranks {
            format!(r#"{alias}."{COL_PARENT}""#)
        } else {
            format!(r#"COALESCE({alias}."{COL_MAJOR_PARENT}", {alias}."{COL_PARENT}")"#)
        }
    };
    let (anchor_step, walk_step) = (step("s"), step("et"));
    format!(
        r#"
        WITH RECURSIVE walk (query_id, taxon_id, next_id, lvl, path) AS (
            SELECT s."{COL_ID}"::bigint, s."{COL_ID}"::bigint, ({anchor_step})::bigint, 0,
                   ARRAY[s."{COL_ID}"::bigint]
              FROM {TABLE} s WHERE s."{COL_ID}" = ANY($1)
            UNION ALL
            SELECT w.query_id, et."{COL_ID}"::bigint, ({walk_step})::bigint, w.lvl + 1,
                   w.path || et."{COL_ID}"::bigint
              FROM {TABLE} et
              JOIN walk w ON et."{COL_ID}" = w.next_id
             WHERE NOT et."{COL_ID}"::bigint = ANY(w.path)
        )
        SELECT taxon_id FROM walk
        GROUP BY taxon_id
        HAVING COUNT(DISTINCT query_id) = $2
        ORDER BY SUM(lvl) ASC, taxon_id ASC
        LIMIT 1
        "#
    )
}

/// Candidate query for one match mode. `$1` pattern, `$2` limit, `$3` ranks.
fn search_sql(plan: &SearchPlan, mode: MatchMode) -> String {
    let compare = if mode.uses_like() {
        r"LIKE $1 ESCAPE '\'"
    } else {
        "= $1"
    };
    let predicate = plan
        .columns
        .iter()
        .map(|col| format!(r#"LOWER("{col}") {compare}"#))
        .collect::<Vec<_>>()
        .join(" OR ");
    let rank_clause = if plan.ranks.is_some() {
        format!(r#" AND "{COL_RANK}"::float8 = ANY($3)"#)
    } else {
        String::new()
    };
    format!(
        r#"SELECT * FROM {TABLE} WHERE ({predicate}) AND COALESCE("{COL_ACTIVE}", TRUE){rank_clause} ORDER BY "{COL_RANK}" ASC, "{COL_NAME}" ASC LIMIT $2"#
    )
}

// ── Service ──────────────────────────────────────────────────────────────

/// Remote-store backend. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgTaxonomyService {
    pool: PgPool,
}

impl PgTaxonomyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &PgConfig) -> Result<Self> {
        Ok(Self::new(config.connect().await?))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_row(&self, id: TaxonId) -> Result<Option<ExpandedRow>> {
        let row = sqlx::query(&row_by_id_sql())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("fetch taxon"))?;
        row.as_ref().map(decode::expanded).transpose()
    }

    async fn require_row(&self, id: TaxonId) -> Result<ExpandedRow> {
        self.fetch_row(id).await?.ok_or(TaxonomyError::NotFound(id))
    }

    async fn fetch_rows(&self, ids: &[TaxonId]) -> Result<HashMap<TaxonId, ExpandedRow>> {
        let rows = sqlx::query(&rows_by_ids_sql())
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("fetch taxa"))?;
        rows.iter()
            .map(|r| decode::expanded(r).map(|row| (row.id, row)))
            .collect()
    }

    /// Rows for every id, in `ids` order; the first absent id is `NotFound`.
    async fn require_rows(&self, ids: &[TaxonId]) -> Result<Vec<ExpandedRow>> {
        let mut found = self.fetch_rows(ids).await?;
        ids.iter()
            .map(|id| found.remove(id).ok_or(TaxonomyError::NotFound(*id)))
            .collect()
    }

    async fn lca_walk(&self, ids: &[TaxonId], include_minor_ranks: bool) -> Result<Option<TaxonId>> {
        let row = sqlx::query(&lca_walk_sql(include_minor_ranks))
            .bind(ids.to_vec())
            .bind(ids.len() as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("lca walk"))?;
        row.map(|r| r.try_get::<i64, _>("taxon_id"))
            .transpose()
            .map_err(db_err("lca walk"))
    }
}

async fn fetch_children(pool: PgPool, id: TaxonId, depth: u32) -> Result<Vec<Taxon>> {
    let depth = i32::try_from(depth).unwrap_or(i32::MAX);
    let rows = sqlx::query(&children_sql())
        .bind(id)
        .bind(depth)
        .fetch_all(&pool)
        .await
        .map_err(db_err("fetch children"))?;
    debug!(taxon_id = id, depth, found = rows.len(), "postgres children");
    rows.iter()
        .map(|r| decode::expanded(r).map(|row| row.to_taxon()))
        .collect()
}

#[async_trait]
impl TaxonomyService for PgTaxonomyService {
    async fn get_taxon(&self, id: TaxonId) -> Result<Taxon> {
        debug!(taxon_id = id, "postgres get_taxon");
        Ok(self.require_row(id).await?.to_taxon())
    }

    async fn children(&self, id: TaxonId, depth: u32) -> Result<Children> {
        if depth == 0 {
            return Ok(Children::empty());
        }
        let pool = self.pool.clone();
        Ok(Children::deferred(move || {
            fetch_children(pool.clone(), id, depth).boxed()
        }))
    }

    async fn children_list(&self, id: TaxonId, depth: u32) -> Result<Vec<Taxon>> {
        self.children(id, depth).await?.fetch_all().await
    }

    async fn lca(&self, ids: &BTreeSet<TaxonId>, include_minor_ranks: bool) -> Result<Taxon> {
        if ids.is_empty() {
            return Err(TaxonomyError::InvalidArgument(
                "lca needs at least one taxon id".into(),
            ));
        }
        let list: Vec<TaxonId> = ids.iter().copied().collect();
        let rows = self.require_rows(&list).await?;
        if let [only] = rows.as_slice() {
            return Ok(only.to_taxon());
        }

        let lca_id = match lca_from_columns(&rows, include_minor_ranks) {
            Some(id) => Some(id),
            None => {
                warn!(ids = ?list, include_minor_ranks, "rank columns inconclusive, walking ancestors");
                self.lca_walk(&list, include_minor_ranks).await?
            }
        };
        let lca_id = lca_id.ok_or_else(|| {
            TaxonomyError::InvalidArgument(format!("taxa {list:?} share no ancestor"))
        })?;
        debug!(ids = ?list, lca = lca_id, include_minor_ranks, "postgres lca");
        self.get_taxon(lca_id).await
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
        let rows = self.require_rows(&[a, b]).await?;
        let a = ancestry_ids(&rows[0], include_minor_ranks);
        let b = ancestry_ids(&rows[1], include_minor_ranks);
        Ok(distance_between(&a, &b, inclusive))
    }

    async fn ancestors(&self, id: TaxonId, include_minor_ranks: bool) -> Result<Vec<TaxonId>> {
        Ok(ancestry_ids(&self.require_row(id).await?, include_minor_ranks))
    }

    async fn subtree(
        &self,
        root_ids: &BTreeSet<TaxonId>,
    ) -> Result<BTreeMap<TaxonId, Option<TaxonId>>> {
        if root_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let roots: Vec<TaxonId> = root_ids.iter().copied().collect();
        let rows = sqlx::query(&subtree_sql())
            .bind(roots.as_slice())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("fetch subtree"))?;

        let mut out = BTreeMap::new();
        for row in &rows {
            let id: i64 = row.try_get("taxon_id").map_err(db_err("fetch subtree"))?;
            let parent: Option<i64> = row.try_get("parent_id").map_err(db_err("fetch subtree"))?;
            let parent = if root_ids.contains(&id) { None } else { parent };
            out.insert(id, parent);
        }
        debug!(roots = ?roots, size = out.len(), "postgres subtree");
        Ok(out)
    }

    async fn search_taxa(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let Some(plan) = request.plan()? else {
            return Ok(Vec::new());
        };
        let ranks = plan.rank_values();
        let mut candidates = Vec::new();
        for mode in plan.attempts {
            let sql = search_sql(&plan, *mode);
            let mut query = sqlx::query(&sql)
                .bind(mode.pattern(&plan.query))
                .bind(plan.candidate_limit as i64);
            if let Some(values) = &ranks {
                query = query.bind(values.clone());
            }
            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(db_err("search taxa"))?;
            debug!(query = %plan.query, mode = %mode, candidates = rows.len(), "postgres search");
            if !rows.is_empty() {
                candidates = rows
                    .iter()
                    .map(|r| decode::expanded(r).map(|row| row.to_taxon()))
                    .collect::<Result<Vec<_>>>()?;
                break;
            }
        }
        Ok(rank_hits(request, candidates))
    }

    async fn taxon_summary(&self, id: TaxonId, major_ranks_only: bool) -> Result<TaxonSummary> {
        let pending = summarize(&self.require_row(id).await?, major_ranks_only);
        let missing = pending.missing_ids();
        let resolved: HashMap<TaxonId, Taxon> = if missing.is_empty() {
            HashMap::new()
        } else {
            self.fetch_rows(&missing)
                .await?
                .into_iter()
                .map(|(id, row)| (id, row.to_taxon()))
                .collect()
        };
        Ok(pending.finish(&resolved))
    }
}
