//! Blocking queries against one connection. Every function here runs inside a
//! worker job.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rusqlite::types::{Value, ValueRef};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, warn};

use taxonomy_core::lineage::{ancestry_ids, lca_by_walk, lca_from_columns};
use taxonomy_core::row::{COL_ACTIVE, COL_ID, COL_NAME, COL_PARENT, COL_RANK, TABLE};
use taxonomy_core::search::{MatchMode, SearchPlan};
use taxonomy_core::summary::{summarize, TaxonSummary};
use taxonomy_core::{Cell, ExpandedRow, RawRow, Result, Taxon, TaxonId, TaxonomyError};

/// Stay well under SQLite's bound-parameter limit.
const IN_CHUNK: usize = 500;

/// Unicode-aware `LOWER`. The built-in one only folds ASCII, which would
/// disagree with the Rust-side lower-casing of the query.
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Install the scalar functions the queries below rely on.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn sql_err(context: &'static str) -> impl Fn(rusqlite::Error) -> TaxonomyError {
    move |e| TaxonomyError::unavailable(context, e)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Run `sql` and parse every result row into an [`ExpandedRow`].
fn query_rows<I>(conn: &Connection, context: &'static str, sql: &str, binds: I) -> Result<Vec<ExpandedRow>>
where
    I: IntoIterator,
    I::Item: rusqlite::ToSql,
{
    let mut stmt = conn.prepare_cached(sql).map_err(sql_err(context))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(binds)).map_err(sql_err(context))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(sql_err(context))? {
        let mut raw = RawRow::new();
        for (i, name) in columns.iter().enumerate() {
            let cell = match row.get_ref(i).map_err(sql_err(context))? {
                ValueRef::Null => Cell::Null,
                ValueRef::Integer(v) => Cell::Int(v),
                ValueRef::Real(v) => Cell::Float(v),
                ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(_) => continue,
            };
            raw.insert(name.clone(), cell);
        }
        out.push(ExpandedRow::parse(&raw)?);
    }
    Ok(out)
}

pub fn fetch_row(conn: &Connection, id: TaxonId) -> Result<Option<ExpandedRow>> {
    let sql = format!(r#"SELECT * FROM {TABLE} WHERE "{COL_ID}" = ?"#);
    Ok(query_rows(conn, "fetch taxon", &sql, [id])?.into_iter().next())
}

pub fn require_row(conn: &Connection, id: TaxonId) -> Result<ExpandedRow> {
    fetch_row(conn, id)?.ok_or(TaxonomyError::NotFound(id))
}

/// Rows for `ids`, keyed by id. Absent ids are simply missing from the map.
pub fn fetch_rows(conn: &Connection, ids: &[TaxonId]) -> Result<HashMap<TaxonId, ExpandedRow>> {
    let mut out = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(IN_CHUNK) {
        let sql = format!(
            r#"SELECT * FROM {TABLE} WHERE "{COL_ID}" IN ({})"#,
            placeholders(chunk.len())
        );
        for row in query_rows(conn, "fetch taxa", &sql, chunk.iter())? {
            out.insert(row.id, row);
        }
    }
    Ok(out)
}

fn child_rows(conn: &Connection, parents: &[TaxonId]) -> Result<Vec<ExpandedRow>> {
    let mut out = Vec::new();
    for chunk in parents.chunks(IN_CHUNK) {
        let sql = format!(
            r#"SELECT * FROM {TABLE} WHERE "{COL_PARENT}" IN ({}) ORDER BY "{COL_ID}""#,
            placeholders(chunk.len())
        );
        out.extend(query_rows(conn, "fetch children", &sql, chunk.iter())?);
    }
    Ok(out)
}

/// Breadth-first descent along the immediate-ancestor back-reference.
/// Returns `(depth, row)` with each taxon at its first (shallowest) depth.
fn descend(
    conn: &Connection,
    roots: &[TaxonId],
    max_depth: Option<u32>,
) -> Result<Vec<(u32, ExpandedRow)>> {
    let mut seen: HashSet<TaxonId> = roots.iter().copied().collect();
    let mut frontier: Vec<TaxonId> = roots.to_vec();
    let mut out = Vec::new();
    let mut depth = 0u32;

    while !frontier.is_empty() && max_depth.map_or(true, |max| depth < max) {
        depth += 1;
        let mut level: Vec<ExpandedRow> = child_rows(conn, &frontier)?
            .into_iter()
            .filter(|r| seen.insert(r.id))
            .collect();
        level.sort_by_key(|r| r.id);
        frontier = level.iter().map(|r| r.id).collect();
        out.extend(level.into_iter().map(|r| (depth, r)));
    }
    Ok(out)
}

pub fn children(conn: &Connection, id: TaxonId, depth: u32) -> Result<Vec<Taxon>> {
    if depth == 0 {
        return Ok(Vec::new());
    }
    let rows = descend(conn, &[id], Some(depth))?;
    debug!(taxon_id = id, depth, found = rows.len(), "sqlite children");
    Ok(rows.into_iter().map(|(_, r)| r.to_taxon()).collect())
}

pub fn subtree(
    conn: &Connection,
    root_ids: &BTreeSet<TaxonId>,
) -> Result<BTreeMap<TaxonId, Option<TaxonId>>> {
    let ids: Vec<TaxonId> = root_ids.iter().copied().collect();
    let present: Vec<TaxonId> = {
        let rows = fetch_rows(conn, &ids)?;
        ids.into_iter().filter(|id| rows.contains_key(id)).collect()
    };

    let mut out: BTreeMap<TaxonId, Option<TaxonId>> =
        present.iter().map(|id| (*id, None)).collect();
    for (_, row) in descend(conn, &present, None)? {
        out.insert(row.id, row.parent_id());
    }
    Ok(out)
}

pub fn ancestors(conn: &Connection, id: TaxonId, include_minor_ranks: bool) -> Result<Vec<TaxonId>> {
    Ok(ancestry_ids(&require_row(conn, id)?, include_minor_ranks))
}

pub fn lca(conn: &Connection, ids: &BTreeSet<TaxonId>, include_minor_ranks: bool) -> Result<Taxon> {
    let list: Vec<TaxonId> = ids.iter().copied().collect();
    let mut rows = fetch_rows(conn, &list)?;
    if let Some(missing) = list.iter().find(|id| !rows.contains_key(id)) {
        return Err(TaxonomyError::NotFound(*missing));
    }
    if let [only] = list.as_slice() {
        return rows
            .remove(only)
            .map(|r| r.to_taxon())
            .ok_or(TaxonomyError::NotFound(*only));
    }

    let ordered: Vec<ExpandedRow> = list.iter().filter_map(|id| rows.get(id).cloned()).collect();
    let lca_id = match lca_from_columns(&ordered, include_minor_ranks) {
        Some(id) => id,
        None => {
            warn!(ids = ?list, include_minor_ranks, "rank columns inconclusive, walking ancestors");
            walk(conn, &list, rows, include_minor_ranks)?.ok_or_else(|| {
                TaxonomyError::InvalidArgument(format!("taxa {list:?} share no ancestor"))
            })?
        }
    };
    debug!(ids = ?list, lca = lca_id, include_minor_ranks, "sqlite lca");
    Ok(require_row(conn, lca_id)?.to_taxon())
}

fn walk(
    conn: &Connection,
    start: &[TaxonId],
    mut known: HashMap<TaxonId, ExpandedRow>,
    include_minor_ranks: bool,
) -> Result<Option<TaxonId>> {
    lca_by_walk(start, |id| {
        if !known.contains_key(&id) {
            match fetch_row(conn, id)? {
                Some(row) => {
                    known.insert(id, row);
                }
                None => return Ok(None),
            }
        }
        Ok(known.get(&id).and_then(|row| {
            if include_minor_ranks {
                row.parent_id()
            } else {
                row.major_step()
            }
        }))
    })
}

pub fn distance(
    conn: &Connection,
    a: TaxonId,
    b: TaxonId,
    include_minor_ranks: bool,
    inclusive: bool,
) -> Result<u32> {
    let a = ancestors(conn, a, include_minor_ranks)?;
    let b = ancestors(conn, b, include_minor_ranks)?;
    Ok(taxonomy_core::lineage::distance_between(&a, &b, inclusive))
}

pub fn summary(conn: &Connection, id: TaxonId, major_ranks_only: bool) -> Result<TaxonSummary> {
    let pending = summarize(&require_row(conn, id)?, major_ranks_only);
    let missing = pending.missing_ids();
    let resolved: HashMap<TaxonId, Taxon> = if missing.is_empty() {
        HashMap::new()
    } else {
        fetch_rows(conn, &missing)?
            .into_iter()
            .map(|(id, row)| (id, row.to_taxon()))
            .collect()
    };
    Ok(pending.finish(&resolved))
}

/// Candidate superset for one match mode, best rank first.
pub fn search(conn: &Connection, plan: &SearchPlan, mode: MatchMode) -> Result<Vec<Taxon>> {
    let compare = if mode.uses_like() {
        r"LIKE ?1 ESCAPE '\'"
    } else {
        "= ?1"
    };
    let predicate = plan
        .columns
        .iter()
        .map(|col| format!(r#"{UNICODE_LOWER}("{col}") {compare}"#))
        .collect::<Vec<_>>()
        .join(" OR ");

    let mut binds = vec![Value::Text(mode.pattern(&plan.query))];
    let mut sql = format!(
        r#"SELECT * FROM {TABLE} WHERE ({predicate}) AND COALESCE("{COL_ACTIVE}", 1)"#
    );
    if let Some(values) = plan.rank_values() {
        let marks = (0..values.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(r#" AND "{COL_RANK}" IN ({marks})"#));
        binds.extend(values.into_iter().map(Value::Real));
    }
    sql.push_str(&format!(
        r#" ORDER BY "{COL_RANK}" ASC, "{COL_NAME}" ASC LIMIT {}"#,
        plan.candidate_limit
    ));

    let rows = query_rows(conn, "search taxa", &sql, binds.iter())?;
    debug!(query = %plan.query, %mode, candidates = rows.len(), "sqlite search");
    Ok(rows.iter().map(ExpandedRow::to_taxon).collect())
}
