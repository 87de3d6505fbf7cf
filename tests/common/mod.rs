//! Shared fixtures: the synthetic tree seeded into a temp SQLite file and,
//! when `TAXONOMY_TEST_DATABASE_URL` is set, into a scratch Postgres schema.

#![allow(dead_code)]

use std::sync::Once;

use rusqlite::{params, Connection};
use sqlx::postgres::PgPoolOptions;
use sqlx::Executor;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use taxonomy_service::{Backend, BackendConfig, PgTaxonomyService, TaxonomyConfig};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// (id, name, rank, parent, common name, active, L70, L60, L40, L10)
type Row = (
    i64,
    &'static str,
    f64,
    Option<i64>,
    Option<&'static str>,
    bool,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
);

pub const ROWS: &[Row] = &[
    (1, "tax1", 70.0, None, Some("Life"), true, Some(1), None, None, None),
    (2, "tax2", 60.0, Some(1), None, true, Some(1), Some(2), None, None),
    (3, "tax3", 40.0, Some(2), None, true, Some(1), Some(2), Some(3), None),
    (4, "tax4", 40.0, Some(2), None, true, Some(1), Some(2), Some(4), None),
    (5, "tax5", 10.0, Some(3), Some("Five Spot"), true, Some(1), Some(2), Some(3), Some(5)),
    (6, "tax6", 10.0, Some(4), None, true, Some(1), Some(2), Some(4), Some(6)),
];

const COLUMNS: &str = r#""taxonID", "name", "rankLevel", "immediateAncestor_taxonID",
    "immediateMajorAncestor_taxonID", "commonName", "taxonActive",
    "L70_taxonID", "L60_taxonID", "L40_taxonID", "L10_taxonID""#;

fn ddl(int: &str, real: &str, boolean: &str) -> String {
    let mut cols = vec![
        format!(r#""taxonID" {int} PRIMARY KEY"#),
        r#""name" TEXT NOT NULL"#.to_string(),
        format!(r#""rankLevel" {real} NOT NULL"#),
        r#""commonName" TEXT"#.to_string(),
        format!(r#""taxonActive" {boolean}"#),
        format!(r#""immediateAncestor_taxonID" {int}"#),
        format!(r#""immediateAncestor_rankLevel" {real}"#),
        format!(r#""immediateMajorAncestor_taxonID" {int}"#),
        format!(r#""immediateMajorAncestor_rankLevel" {real}"#),
    ];
    for prefix in ["L70", "L60", "L40", "L10"] {
        cols.push(format!(r#""{prefix}_taxonID" {int}"#));
        cols.push(format!(r#""{prefix}_name" TEXT"#));
        cols.push(format!(r#""{prefix}_commonName" TEXT"#));
    }
    format!("CREATE TABLE expanded_taxa ({})", cols.join(", "))
}

/// Local backend over a fresh temp file. Keep the `TempDir` alive.
pub async fn sqlite_backend() -> (TempDir, Backend) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taxa.sqlite");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(&ddl("INTEGER", "REAL", "INTEGER")).unwrap();
        let sql = format!("INSERT INTO expanded_taxa ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8, ?9, ?10)");
        for r in ROWS {
            conn.execute(&sql, params![r.0, r.1, r.2, r.3, r.4, r.5, r.6, r.7, r.8, r.9])
                .unwrap();
        }
    }
    let yaml = format!(
        "backend:\n  kind: sqlite\n  path: {}\n  workers: 2\n",
        path.display()
    );
    let config = TaxonomyConfig::from_yaml(&yaml).unwrap();
    assert!(matches!(config.backend, BackendConfig::Sqlite { workers: 2, .. }));
    let backend = Backend::connect(&config).await.unwrap();
    (dir, backend)
}

/// Remote backend seeded into its own schema, or `None` without a test database.
pub async fn postgres_backend() -> Option<Backend> {
    let Ok(url) = std::env::var("TAXONOMY_TEST_DATABASE_URL") else {
        eprintln!("SKIP: TAXONOMY_TEST_DATABASE_URL not set, running sqlite backend only");
        return None;
    };
    init_tracing();
    let schema = format!("taxonomy_it_{}", uuid::Uuid::new_v4().simple());
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
    pool.execute(ddl("integer", "double precision", "boolean").as_str())
        .await
        .unwrap();
    let sql = format!(
        "INSERT INTO expanded_taxa ({COLUMNS}) VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8, $9, $10)"
    );
    for r in ROWS {
        sqlx::query(&sql)
            .bind(r.0 as i32)
            .bind(r.1)
            .bind(r.2)
            .bind(r.3.map(|v| v as i32))
            .bind(r.4)
            .bind(r.5)
            .bind(r.6.map(|v| v as i32))
            .bind(r.7.map(|v| v as i32))
            .bind(r.8.map(|v| v as i32))
            .bind(r.9.map(|v| v as i32))
            .execute(&pool)
            .await
            .unwrap();
    }
    Some(Backend::from(PgTaxonomyService::new(pool)))
}
