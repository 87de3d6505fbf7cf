//! Runs only when `TAXONOMY_TEST_DATABASE_URL` points at a scratch database.
//! Each test seeds the synthetic tree into its own schema.

use std::collections::{BTreeMap, BTreeSet};

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use taxonomy_core::{
    MatchMode, RankLevel, SearchRequest, SearchScope, TaxonomyError, TaxonomyService,
};
use taxonomy_postgres::PgTaxonomyService;

const SCHEMA_SQL: &str = r#"
CREATE TABLE expanded_taxa (
    "taxonID" integer PRIMARY KEY,
    "name" text NOT NULL,
    "rankLevel" double precision NOT NULL,
    "commonName" text,
    "taxonActive" boolean,
    "immediateAncestor_taxonID" integer,
    "immediateAncestor_rankLevel" double precision,
    "immediateMajorAncestor_taxonID" integer,
    "immediateMajorAncestor_rankLevel" double precision,
    "L10_taxonID" integer, "L10_name" text, "L10_commonName" text,
    "L40_taxonID" integer, "L40_name" text, "L40_commonName" text,
    "L60_taxonID" integer, "L60_name" text, "L60_commonName" text,
    "L70_taxonID" integer, "L70_name" text, "L70_commonName" text
);
INSERT INTO expanded_taxa
    ("taxonID", "name", "rankLevel", "taxonActive", "immediateAncestor_taxonID",
     "immediateMajorAncestor_taxonID", "L70_taxonID", "L60_taxonID", "L40_taxonID", "L10_taxonID")
VALUES
    (1, 'tax1', 70, TRUE, NULL, NULL, 1, NULL, NULL, NULL),
    (2, 'tax2', 60, TRUE, 1, 1, 1, 2, NULL, NULL),
    (3, 'tax3', 40, TRUE, 2, 2, 1, 2, 3, NULL),
    (4, 'tax4', 40, NULL, 2, 2, 1, 2, 4, NULL),
    (5, 'tax5', 10, TRUE, 3, 3, 1, 2, 3, 5),
    (6, 'tax6', 10, TRUE, 4, 4, 1, 2, 4, 6),
    (7, 'tax7', 10, FALSE, 4, 4, 1, 2, 4, 7),
    (8, 'tax8', 10, TRUE, 4, 4, NULL, NULL, NULL, NULL);
"#;

async fn seeded() -> Option<(PgPool, PgTaxonomyService)> {
    let Ok(url) = std::env::var("TAXONOMY_TEST_DATABASE_URL") else {
        eprintln!("SKIP: TAXONOMY_TEST_DATABASE_URL not set, postgres queries not exercised");
        return None;
    };
    let schema = format!("taxonomy_test_{}", uuid::Uuid::new_v4().simple());
    let search_path = schema.clone();
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .after_connect(move |conn, _meta| {
            let sql = format!("SET search_path TO {search_path}");
            Box::pin(async move {
                conn.execute(sql.as_str()).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .expect("connect to test database");
    pool.execute(format!("CREATE SCHEMA {schema}").as_str())
        .await
        .unwrap();
    pool.execute(SCHEMA_SQL).await.unwrap();
    Some((pool.clone(), PgTaxonomyService::new(pool)))
}

fn ids<I: IntoIterator<Item = i64>>(ids: I) -> BTreeSet<i64> {
    ids.into_iter().collect()
}

#[tokio::test]
async fn lookups_and_lineage() {
    let Some((_pool, svc)) = seeded().await else { return };
    assert_eq!(svc.get_taxon(5).await.unwrap().ancestry, vec![1, 2, 3, 5]);
    assert_eq!(svc.get_taxon(404).await.unwrap_err(), TaxonomyError::NotFound(404));
    assert_eq!(svc.ancestors(6, false).await.unwrap(), vec![1, 2, 4, 6]);
    assert_eq!(svc.distance(5, 6, false, false).await.unwrap(), 4);
    assert_eq!(svc.distance(5, 5, false, true).await.unwrap(), 0);
}

#[tokio::test]
async fn lca_fast_path_and_walk() {
    let Some((_pool, svc)) = seeded().await else { return };
    assert_eq!(svc.lca(&ids([5, 6]), false).await.unwrap().id, 2);
    assert_eq!(svc.lca(&ids([5, 6]), true).await.unwrap().id, 2);
    // 8 carries no rank columns: the recursive walk decides.
    assert_eq!(svc.lca(&ids([8, 6]), false).await.unwrap().id, 4);
    assert_eq!(svc.lca(&ids([8, 6]), true).await.unwrap().id, 4);
    assert!(matches!(
        svc.lca(&BTreeSet::new(), false).await,
        Err(TaxonomyError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn children_cursor_is_deferred_and_shared() {
    let Some((_pool, svc)) = seeded().await else { return };
    let cursor = svc.children(2, 2).await.unwrap();
    assert!(!cursor.is_materialized());
    let ids: Vec<_> = cursor.fetch_all().await.unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![3, 4, 5, 6, 7, 8]);
    assert!(cursor.clone().is_materialized());
    assert!(svc.children_list(2, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn subtree_of_phylum() {
    let Some((_pool, svc)) = seeded().await else { return };
    let tree = svc.subtree(&ids([3, 404])).await.unwrap();
    let expected: BTreeMap<i64, Option<i64>> = [(3, None), (5, Some(3))].into();
    assert_eq!(tree, expected);
}

#[tokio::test]
async fn search_skips_inactive_rows() {
    let Some((_pool, svc)) = seeded().await else { return };
    let exact = SearchRequest::new("tax3")
        .scopes([SearchScope::Scientific])
        .match_mode(MatchMode::Exact)
        .fuzzy(false)
        .with_scores(true);
    let hits = svc.search_taxa(&exact).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].score, Some(1.0));

    let all = svc
        .search_taxa(&SearchRequest::new("tax").match_mode(MatchMode::Prefix).fuzzy(false))
        .await
        .unwrap();
    let ids: Vec<_> = all.iter().map(|h| h.taxon.id).collect();
    assert!(!ids.contains(&7));
    assert!(ids.contains(&4));
}

#[tokio::test]
async fn search_rank_filter_and_escaping() {
    let Some((_pool, svc)) = seeded().await else { return };
    let orders = svc
        .search_taxa(
            &SearchRequest::new("tax")
                .match_mode(MatchMode::Prefix)
                .fuzzy(false)
                .rank_filter([RankLevel::L40]),
        )
        .await
        .unwrap();
    assert_eq!(orders.iter().map(|h| h.taxon.id).collect::<Vec<_>>(), vec![3, 4]);

    let unfiltered = svc
        .search_taxa(
            &SearchRequest::new("tax3")
                .match_mode(MatchMode::Exact)
                .fuzzy(false)
                .rank_filter(std::iter::empty()),
        )
        .await
        .unwrap();
    assert_eq!(unfiltered.len(), 1);

    assert!(svc
        .search_taxa(&SearchRequest::new("%").fuzzy(false))
        .await
        .unwrap()
        .is_empty());
}
