use std::collections::BTreeSet;

use tokio::sync::OnceCell;

use crate::error::Result;
use crate::service::{TaxonomyService, TaxonomyServiceExt};
use crate::taxon::Taxon;
use crate::TaxonId;

/// A named set of root taxa, e.g. "pollinating insects".
///
/// The resolved roots are cached on first use and never invalidated, so a
/// clade stays bound to whichever service resolved it first.
#[derive(Debug)]
pub struct Clade {
    root_ids: BTreeSet<TaxonId>,
    name: Option<String>,
    roots: OnceCell<Vec<Taxon>>,
}

impl Clade {
    pub fn new(root_ids: impl IntoIterator<Item = TaxonId>, name: Option<String>) -> Self {
        Self {
            root_ids: root_ids.into_iter().collect(),
            name,
            roots: OnceCell::new(),
        }
    }

    pub fn root_ids(&self) -> &BTreeSet<TaxonId> {
        &self.root_ids
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Root taxa in id order. Concurrent first callers share one lookup.
    pub async fn roots(&self, service: &dyn TaxonomyService) -> Result<&[Taxon]> {
        let roots = self
            .roots
            .get_or_try_init(|| async {
                let ids: Vec<TaxonId> = self.root_ids.iter().copied().collect();
                service.get_many(&ids).await
            })
            .await?;
        Ok(roots.as_slice())
    }
}
