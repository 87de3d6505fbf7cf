//! Coarse pollinator groupings used for labels.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::TaxonId;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum PollinatorGroup {
    Bee,
    #[strum(serialize = "Butterfly/Moth")]
    #[serde(rename = "Butterfly/Moth")]
    ButterflyMoth,
    Fly,
    Wasp,
    Beetle,
    Bird,
    Bat,
    Other,
}

impl PollinatorGroup {
    /// Root taxon of the group. `Other` has none.
    pub fn root_taxon_id(self) -> Option<TaxonId> {
        match self {
            Self::Bee => Some(630955),          // Anthophila
            Self::ButterflyMoth => Some(47157), // Lepidoptera
            Self::Fly => Some(47822),           // Diptera
            Self::Wasp => Some(52747),          // Vespidae
            Self::Beetle => Some(47208),        // Coleoptera
            Self::Bird => Some(3),              // Aves
            Self::Bat => Some(40268),           // Chiroptera
            Self::Other => None,
        }
    }
}

/// Every group whose root appears in `ancestry`. Empty when nothing matches;
/// callers decide whether that means `Other`.
pub fn groups_for_ancestry(ancestry: &[TaxonId]) -> BTreeSet<PollinatorGroup> {
    let ids: HashSet<TaxonId> = ancestry.iter().copied().collect();
    PollinatorGroup::iter()
        .filter(|g| g.root_taxon_id().is_some_and(|root| ids.contains(&root)))
        .collect()
}
