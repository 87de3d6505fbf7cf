//! PostgreSQL adapter for the taxonomy service.
//!
//! A newtype over `PgPool`. Lineage and LCA come from the wide rank columns
//! when they are populated and from recursive CTEs when they are not; every
//! `sqlx::Error` is collapsed into `TaxonomyError::Unavailable` here.

pub mod config;
mod decode;
mod service;

pub use config::{mask_database_url, PgConfig};
pub use service::PgTaxonomyService;
