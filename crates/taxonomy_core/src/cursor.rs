//! Children cursor: one memoized query execution, consumed either as a whole
//! list or as a stream.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::taxon::Taxon;

type Fetch = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<Taxon>>> + Send + Sync>;

/// Descendants returned by `TaxonomyService::children`.
///
/// A deferred cursor runs its query on first consumption only. Clones share
/// the execution; concurrent consumers await the same run. A failed run is
/// not cached, so the next consumer retries.
#[derive(Clone)]
pub struct Children {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    Ready(Arc<Vec<Taxon>>),
    Deferred {
        cell: Arc<OnceCell<Arc<Vec<Taxon>>>>,
        fetch: Fetch,
    },
}

impl Children {
    pub fn ready(taxa: Vec<Taxon>) -> Self {
        Self {
            inner: Inner::Ready(Arc::new(taxa)),
        }
    }

    pub fn empty() -> Self {
        Self::ready(Vec::new())
    }

    pub fn deferred<F>(fetch: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Vec<Taxon>>> + Send + Sync + 'static,
    {
        Self {
            inner: Inner::Deferred {
                cell: Arc::new(OnceCell::new()),
                fetch: Arc::new(fetch),
            },
        }
    }

    /// Whether the underlying query has already produced its rows.
    pub fn is_materialized(&self) -> bool {
        match &self.inner {
            Inner::Ready(_) => true,
            Inner::Deferred { cell, .. } => cell.initialized(),
        }
    }

    async fn rows(&self) -> Result<Arc<Vec<Taxon>>> {
        match &self.inner {
            Inner::Ready(rows) => Ok(Arc::clone(rows)),
            Inner::Deferred { cell, fetch } => cell
                .get_or_try_init(|| async { fetch().await.map(Arc::new) })
                .await
                .map(Arc::clone),
        }
    }

    pub async fn fetch_all(&self) -> Result<Vec<Taxon>> {
        Ok(self.rows().await?.as_ref().clone())
    }

    /// Yields each taxon, or a single error item if the query fails.
    pub fn stream(&self) -> BoxStream<'_, Result<Taxon>> {
        stream::once(self.rows())
            .flat_map(|res| match res {
                Ok(rows) => {
                    let items: Vec<Result<Taxon>> = rows.iter().cloned().map(Ok).collect();
                    stream::iter(items).boxed()
                }
                Err(e) => stream::iter(vec![Err(e)]).boxed(),
            })
            .boxed()
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Ready(rows) => f.debug_tuple("Children::Ready").field(&rows.len()).finish(),
            Inner::Deferred { cell, .. } => f
                .debug_struct("Children::Deferred")
                .field("materialized", &cell.initialized())
                .finish(),
        }
    }
}
