use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use taxonomy_core::{Result, TaxonomyError};

use crate::queries::register_functions;

type Factory = Arc<dyn Fn() -> rusqlite::Result<Connection> + Send + Sync>;

/// Idle connections waiting for the next worker job. Grows on demand up to
/// the number of concurrent jobs, which the worker pool bounds.
pub(crate) struct ConnectionStack {
    idle: Mutex<Vec<Connection>>,
    factory: Factory,
}

impl ConnectionStack {
    pub fn new(factory: Factory) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            factory,
        }
    }

    /// Take a freshly opened connection into the stack.
    pub fn adopt(&self, conn: Connection) -> Result<()> {
        register_functions(&conn).map_err(|e| TaxonomyError::unavailable("prepare sqlite", e))?;
        self.push(conn);
        Ok(())
    }

    fn push(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(conn);
        }
    }

    fn checkout(&self) -> Result<Connection> {
        let reused = self
            .idle
            .lock()
            .map_err(|e| TaxonomyError::unavailable("connection stack poisoned", e))?
            .pop();
        match reused {
            Some(conn) => Ok(conn),
            None => {
                let conn = (self.factory)()
                    .map_err(|e| TaxonomyError::unavailable("open sqlite", e))?;
                register_functions(&conn)
                    .map_err(|e| TaxonomyError::unavailable("prepare sqlite", e))?;
                Ok(conn)
            }
        }
    }

    /// Run `f` on a checked-out connection, then return it to the stack.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.checkout()?;
        let out = f(&conn);
        self.push(conn);
        out
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}
