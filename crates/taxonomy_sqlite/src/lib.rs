//! SQLite adapter for the taxonomy service.
//!
//! Answers come from the precomputed `L*_taxonID` columns of the wide
//! `expanded_taxa` table; the graph is only walked when those columns are
//! too sparse. `rusqlite` is blocking, so every query runs as a job on an
//! injected [`WorkerPool`] against a connection checked out for that job.

mod connections;
pub mod pool;
mod queries;
mod service;

pub use pool::WorkerPool;
pub use service::SqliteTaxonomyService;
