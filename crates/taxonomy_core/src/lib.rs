//! Taxonomy Core - read-only taxonomic hierarchy queries
//!
//! Pure types and algorithms shared by every storage backend, plus the
//! [`TaxonomyService`] port they implement. No database driver lives here.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Callers: TaxonomyService / TaxonomyServiceExt, Clade    │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │  taxonomy_sqlite         │  │  taxonomy_postgres       │
//! │  rank-column lookups     │  │  recursive CTE walks     │
//! │  bounded worker pool     │  │  native async I/O        │
//! └──────────────────────────┘  └──────────────────────────┘
//!               │                             │
//!               └──────────────┬──────────────┘
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  RawRow → ExpandedRow → lineage / scoring / summary      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use taxonomy_core::{SearchRequest, TaxonomyService, TaxonomyServiceExt};
//!
//! let honey_bee = service.get_taxon(47219).await?;
//! let path = service.ancestors(47219, false).await?;
//! let hits = service
//!     .search_taxa(&SearchRequest::new("honey be").with_scores(true))
//!     .await?;
//! let groups = service.pollinator_groups_for_taxon(47219).await?;
//! ```

pub mod clade;
pub mod cursor;
pub mod error;
pub mod lineage;
pub mod pollinator;
pub mod rank;
pub mod row;
pub mod scoring;
pub mod search;
pub mod service;
pub mod summary;
pub mod taxon;

#[cfg(test)]
mod testing;

/// Numeric taxon identifier as stored in `expanded_taxa."taxonID"`.
pub type TaxonId = i64;

pub use clade::Clade;
pub use cursor::Children;
pub use error::{Result, TaxonomyError};
pub use pollinator::{groups_for_ancestry, PollinatorGroup};
pub use rank::{infer_rank, is_major, RankLevel, MAJOR_RANKS};
pub use row::{Cell, ExpandedRow, RawRow};
pub use scoring::score_match;
pub use search::{MatchMode, SearchHit, SearchPlan, SearchRequest, SearchScope};
pub use service::{TaxonomyService, TaxonomyServiceExt};
pub use summary::{TaxonSummary, TaxonTrailNode, DEFAULT_TRAIL_SEPARATOR};
pub use taxon::Taxon;
