//! Shared application state for the progress server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::store::ProgressDb;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RwLock<ProgressDb>>,
    /// JSON file rewritten after every mutation; `None` keeps data in memory.
    pub data_file: Option<Arc<PathBuf>>,
}

impl AppState {
    pub fn new(db: ProgressDb, data_file: Option<PathBuf>) -> Self {
        Self {
            db: Arc::new(RwLock::new(db)),
            data_file: data_file.map(Arc::new),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(ProgressDb::new(), None)
    }

    /// Write `db` to the data file, if one is configured.
    ///
    /// Callers pass the guard they mutated through so writes stay ordered.
    pub fn persist(&self, db: &ProgressDb) -> Result<()> {
        match &self.data_file {
            Some(path) => db.save(path),
            None => Ok(()),
        }
    }
}
