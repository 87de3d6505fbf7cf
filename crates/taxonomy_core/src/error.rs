use thiserror::Error;

use crate::TaxonId;

pub type Result<T> = std::result::Result<T, TaxonomyError>;

/// Failure taxonomy shared by every backend.
///
/// Driver-specific errors never cross a backend boundary; they are collapsed
/// into [`TaxonomyError::Unavailable`] before leaving the adapter crate.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaxonomyError {
    #[error("taxon not found: {0}")]
    NotFound(TaxonId),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("unknown rank: {0}")]
    UnknownRank(String),
}

impl TaxonomyError {
    /// Wrap a driver/IO failure with the operation that triggered it.
    pub fn unavailable(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Unavailable(format!("{context}: {err}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
