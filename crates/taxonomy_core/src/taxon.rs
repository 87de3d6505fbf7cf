use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rank::RankLevel;
use crate::TaxonId;

/// Language tag under which the store's single common name is published.
pub const DEFAULT_VERNACULAR_LANG: &str = "en";

/// Immutable taxon value. Built fresh for every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxon {
    pub id: TaxonId,
    pub scientific_name: String,
    pub rank_level: RankLevel,
    pub parent_id: Option<TaxonId>,
    /// Root → self inclusive. Empty when the backing row has no rank columns.
    pub ancestry: Vec<TaxonId>,
    pub vernacular: BTreeMap<String, Vec<String>>,
}

impl Taxon {
    pub fn new(
        id: TaxonId,
        scientific_name: impl Into<String>,
        rank_level: RankLevel,
        parent_id: Option<TaxonId>,
        ancestry: Vec<TaxonId>,
        common_name: Option<String>,
    ) -> Self {
        let mut vernacular = BTreeMap::new();
        if let Some(name) = common_name.filter(|n| !n.trim().is_empty()) {
            vernacular.insert(DEFAULT_VERNACULAR_LANG.to_string(), vec![name]);
        }
        Self {
            id,
            scientific_name: scientific_name.into(),
            rank_level,
            parent_id,
            ancestry,
            vernacular,
        }
    }

    /// First common name in the default language, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.vernacular
            .get(DEFAULT_VERNACULAR_LANG)
            .and_then(|names| names.first())
            .map(String::as_str)
    }
}
