//! Taxonomy Service - read-only queries over a taxonomic hierarchy
//!
//! Point lookup, children, lowest common ancestor, distance, subtree,
//! ancestry trails and fuzzy name search over the wide `expanded_taxa` table.
//!
//! ## Architecture
//!
//! ```text
//!   TaxonomyConfig (YAML / env)
//!          │
//!          ▼
//!   Backend::connect ──► Backend::Local  (taxonomy_sqlite, worker pool)
//!                   └──► Backend::Remote (taxonomy_postgres, PgPool)
//!          │
//!          ▼
//!   dyn TaxonomyService + TaxonomyServiceExt  (taxonomy_core)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taxonomy_service::{Backend, TaxonomyConfig, TaxonomyService};
//!
//! let config = TaxonomyConfig::from_file("config/taxonomy.yaml")?;
//! let backend = Backend::connect(&config).await?;
//! let lca = backend.lca(&[47219, 52747].into(), false).await?;
//! ```

pub mod backend;
pub mod config;

pub use backend::Backend;
pub use config::{BackendConfig, ConfigError, PostgresSettings, TaxonomyConfig};

pub use taxonomy_core::{
    Children, Clade, PollinatorGroup, RankLevel, Result, SearchHit, SearchRequest, SearchScope,
    MatchMode, Taxon, TaxonId, TaxonSummary, TaxonTrailNode, TaxonomyError, TaxonomyService,
    TaxonomyServiceExt,
};
pub use taxonomy_postgres::{mask_database_url, PgConfig, PgTaxonomyService};
pub use taxonomy_sqlite::{SqliteTaxonomyService, WorkerPool};
