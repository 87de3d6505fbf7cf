//! Bounded worker pool for blocking SQLite calls.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use taxonomy_core::{Result, TaxonomyError};

/// Runs blocking jobs on `spawn_blocking`, at most `size` at a time.
///
/// The runtime handle is explicit so the pool can be built outside an async
/// context and shared between services.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub const DEFAULT_SIZE: usize = 4;

    pub fn new(handle: Handle, size: usize) -> Self {
        let size = size.max(1);
        Self {
            handle,
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Pool on the runtime of the calling task.
    pub fn current(size: usize) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| TaxonomyError::unavailable("worker pool needs a tokio runtime", e))?;
        Ok(Self::new(handle, size))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` on a blocking thread and suspend until it finishes.
    pub async fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| TaxonomyError::unavailable("worker pool closed", e))?;
        self.handle
            .spawn_blocking(move || {
                let _permit = permit;
                job()
            })
            .await
            .map_err(|e| TaxonomyError::unavailable("worker job failed", e))?
    }
}
