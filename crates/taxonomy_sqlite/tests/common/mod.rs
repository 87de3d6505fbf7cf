//! SQLite fixture: the synthetic tree (ids 1-6) plus a small Hymenoptera
//! sample with minor ranks, names and one inactive taxon.

use rusqlite::{params_from_iter, types::Value, Connection};
use tempfile::TempDir;

use taxonomy_core::row::{rank_common_column, rank_id_column, rank_name_column};
use taxonomy_core::RankLevel;
use taxonomy_sqlite::{SqliteTaxonomyService, WorkerPool};

pub struct Seed {
    pub id: i64,
    pub name: &'static str,
    pub rank: f64,
    pub parent: Option<i64>,
    pub major_parent: Option<i64>,
    pub common: Option<&'static str>,
    pub active: bool,
    /// (rank, ancestor id, stored ancestor name)
    pub lineage: Vec<(RankLevel, i64, Option<&'static str>)>,
}

fn seed(
    id: i64,
    name: &'static str,
    rank: f64,
    parent: Option<i64>,
    major_parent: Option<i64>,
    common: Option<&'static str>,
    lineage: Vec<(RankLevel, i64, Option<&'static str>)>,
) -> Seed {
    Seed { id, name, rank, parent, major_parent, common, active: true, lineage }
}

pub fn synthetic() -> Vec<Seed> {
    use RankLevel::*;
    let base = |extra: Vec<(RankLevel, i64, Option<&'static str>)>| {
        let mut l = vec![(L70, 1, Some("tax1")), (L60, 2, Some("tax2"))];
        l.extend(extra);
        l
    };
    vec![
        seed(1, "tax1", 70.0, None, None, None, vec![(L70, 1, Some("tax1"))]),
        seed(2, "tax2", 60.0, Some(1), Some(1), None, base(vec![])),
        seed(3, "tax3", 40.0, Some(2), Some(2), None, base(vec![(L40, 3, Some("tax3"))])),
        seed(4, "tax4", 40.0, Some(2), Some(2), None, base(vec![(L40, 4, Some("tax4"))])),
        seed(5, "tax5", 10.0, Some(3), Some(3), None, base(vec![(L40, 3, Some("tax3")), (L10, 5, Some("tax5"))])),
        seed(6, "tax6", 10.0, Some(4), Some(4), None, base(vec![(L40, 4, Some("tax4")), (L10, 6, Some("tax6"))])),
    ]
}

pub fn hymenoptera() -> Vec<Seed> {
    use RankLevel::*;
    let insect = || {
        vec![
            (L70, 1000, Some("Animalia")),
            (L60, 47120, Some("Arthropoda")),
            (L50, 47158, Some("Insecta")),
            (L40, 47201, Some("Hymenoptera")),
        ]
    };
    let with = |extra: Vec<(RankLevel, i64, Option<&'static str>)>| {
        let mut l = insect();
        l.extend(extra);
        l
    };
    let mut inactive = seed(
        99999, "Apis extincta", 10.0, Some(47220), Some(47220), None,
        with(vec![(L32, 630955, Some("Anthophila")), (L30, 47221, Some("Apidae")), (L20, 47220, Some("Apis")), (L10, 99999, None)]),
    );
    inactive.active = false;
    vec![
        seed(1000, "Animalia", 70.0, None, None, Some("Animals"), vec![(L70, 1000, Some("Animalia"))]),
        seed(47120, "Arthropoda", 60.0, Some(1000), Some(1000), None, vec![(L70, 1000, Some("Animalia")), (L60, 47120, None)]),
        seed(47158, "Insecta", 50.0, Some(47120), Some(47120), Some("Insects"), insect()[..3].to_vec()),
        seed(47201, "Hymenoptera", 40.0, Some(47158), Some(47158), None, insect()),
        // Vespoidea's name is deliberately absent from its descendants' rows.
        seed(48740, "Vespoidea", 33.0, Some(47201), Some(47201), None, with(vec![(L33, 48740, None)])),
        seed(52747, "Vespidae", 30.0, Some(48740), Some(47201), Some("Hornets, Paper Wasps and Allies"),
            with(vec![(L33, 48740, None), (L30, 52747, Some("Vespidae"))])),
        seed(54327, "Vespa", 20.0, Some(52747), Some(52747), None,
            with(vec![(L33, 48740, None), (L30, 52747, Some("Vespidae")), (L20, 54327, Some("Vespa"))])),
        seed(54328, "Vespa crabro", 10.0, Some(54327), Some(54327), Some("European Hornet"),
            with(vec![(L33, 48740, None), (L30, 52747, Some("Vespidae")), (L20, 54327, Some("Vespa")), (L10, 54328, None)])),
        seed(630955, "Anthophila", 32.0, Some(47201), Some(47201), Some("Bees"),
            with(vec![(L32, 630955, Some("Anthophila"))])),
        seed(47221, "Apidae", 30.0, Some(630955), Some(47201), None,
            with(vec![(L32, 630955, Some("Anthophila")), (L30, 47221, Some("Apidae"))])),
        seed(47220, "Apis", 20.0, Some(47221), Some(47221), None,
            with(vec![(L32, 630955, Some("Anthophila")), (L30, 47221, Some("Apidae")), (L20, 47220, Some("Apis"))])),
        seed(47219, "Apis mellifera", 10.0, Some(47220), Some(47220), Some("Western Honey Bee"),
            with(vec![(L32, 630955, Some("Anthophila")), (L30, 47221, Some("Apidae")), (L20, 47220, Some("Apis")), (L10, 47219, None)])),
        // Placed under Apis but with no rank columns filled in.
        seed(77777, "Apis incertae", 10.0, Some(47220), Some(47220), None, vec![]),
        inactive,
    ]
}

/// A name with a non-ASCII capital.
pub fn plants() -> Vec<Seed> {
    vec![seed(
        50001, "Échinacea", 20.0, None, None, Some("Coneflowers"),
        vec![(RankLevel::L20, 50001, Some("Échinacea"))],
    )]
}

pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    let mut columns = vec![
        r#""taxonID" INTEGER PRIMARY KEY"#.to_string(),
        r#""name" TEXT NOT NULL"#.to_string(),
        r#""rankLevel" REAL NOT NULL"#.to_string(),
        r#""commonName" TEXT"#.to_string(),
        r#""taxonActive" INTEGER"#.to_string(),
        r#""immediateAncestor_taxonID" INTEGER"#.to_string(),
        r#""immediateAncestor_rankLevel" REAL"#.to_string(),
        r#""immediateMajorAncestor_taxonID" INTEGER"#.to_string(),
        r#""immediateMajorAncestor_rankLevel" REAL"#.to_string(),
    ];
    for rank in RankLevel::ALL {
        columns.push(format!(r#""{}" INTEGER"#, rank_id_column(rank)));
        columns.push(format!(r#""{}" TEXT"#, rank_name_column(rank)));
        columns.push(format!(r#""{}" TEXT"#, rank_common_column(rank)));
    }
    conn.execute_batch(&format!(
        "CREATE TABLE expanded_taxa ({});\
         CREATE INDEX idx_parent ON expanded_taxa (\"immediateAncestor_taxonID\");",
        columns.join(", ")
    ))
}

pub fn insert(conn: &Connection, seeds: &[Seed]) -> rusqlite::Result<()> {
    for s in seeds {
        let mut names = vec![
            "taxonID", "name", "rankLevel", "commonName", "taxonActive",
            "immediateAncestor_taxonID", "immediateMajorAncestor_taxonID",
        ]
        .into_iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>();
        let mut values = vec![
            Value::Integer(s.id),
            Value::Text(s.name.into()),
            Value::Real(s.rank),
            s.common.map_or(Value::Null, |c| Value::Text(c.into())),
            Value::Integer(i64::from(s.active)),
            s.parent.map_or(Value::Null, Value::Integer),
            s.major_parent.map_or(Value::Null, Value::Integer),
        ];
        for (rank, id, name) in &s.lineage {
            names.push(format!("\"{}\"", rank_id_column(*rank)));
            values.push(Value::Integer(*id));
            names.push(format!("\"{}\"", rank_name_column(*rank)));
            values.push(name.map_or(Value::Null, |n| Value::Text(n.into())));
        }
        let marks = vec!["?"; values.len()].join(", ");
        conn.execute(
            &format!("INSERT INTO expanded_taxa ({}) VALUES ({marks})", names.join(", ")),
            params_from_iter(values.iter()),
        )?;
    }
    Ok(())
}

/// Writes the fixture to a temp file and opens it read-only. Keep the
/// returned `TempDir` alive for the duration of the test.
pub fn open_fixture(workers: usize) -> (TempDir, SqliteTaxonomyService) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taxonomy.sqlite");
    {
        let conn = Connection::open(&path).unwrap();
        create_schema(&conn).unwrap();
        insert(&conn, &synthetic()).unwrap();
        insert(&conn, &hymenoptera()).unwrap();
        insert(&conn, &plants()).unwrap();
    }
    let pool = WorkerPool::current(workers).unwrap();
    let service = SqliteTaxonomyService::open(&path, pool).unwrap();
    (dir, service)
}
