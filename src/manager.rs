//! Snapshot ownership and copy-on-publish reloads.
//!
//! `DatabaseManager` holds the currently published snapshot behind a
//! read/write lock. Loads decode a complete `Database` off to the side and
//! swap it in under a short write guard, so concurrent searches always see
//! either the previous snapshot or the new one, never a partially decoded
//! state. A dedicated load lane keeps at most one load in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::database::Database;
use crate::error::Result;
use crate::types::SearchHit;

/// Location of the database inside the user data directory, where the
/// FSearch indexer writes it.
const DATABASE_RELATIVE_PATH: &str = "fsearch/fsearch.db";

/// Returns the conventional database location for the current user, or
/// `None` when no user data directory can be resolved.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(DATABASE_RELATIVE_PATH))
}

/// Owns the currently published database snapshot.
#[derive(Debug, Default)]
pub struct DatabaseManager {
    current: RwLock<Option<Arc<Database>>>,
    load_lane: Mutex<()>,
}

impl DatabaseManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the database at `path` and publishes it, replacing any
    /// previous snapshot. On failure the previous snapshot stays published.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let _lane = self.load_lane.lock();
        self.load_and_publish(path.as_ref())
    }

    /// Loads only when no snapshot is published yet; the snapshot then
    /// stays resident until [`unload`](Self::unload) or a fresh
    /// [`load`](Self::load). Returns whether a load actually ran.
    pub fn ensure_loaded(&self, path: impl AsRef<Path>) -> Result<bool> {
        let _lane = self.load_lane.lock();
        if self.current.read().is_some() {
            return Ok(false);
        }
        self.load_and_publish(path.as_ref()).map(|()| true)
    }

    fn load_and_publish(&self, path: &Path) -> Result<()> {
        match Database::load(path) {
            Ok(database) => {
                *self.current.write() = Some(Arc::new(database));
                Ok(())
            }
            Err(error) => {
                log::warn!(
                    "failed to load fsearch database {}: {}",
                    path.display(),
                    error
                );
                Err(error)
            }
        }
    }

    /// Drops the published snapshot.
    pub fn unload(&self) {
        *self.current.write() = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// The current snapshot, if any. Callers search the returned `Arc`
    /// without holding the lock.
    pub fn snapshot(&self) -> Option<Arc<Database>> {
        self.current.read().clone()
    }

    /// Searches the published snapshot. Degrades to no hits when nothing is
    /// loaded; never fails.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        match self.snapshot() {
            Some(database) => database.search(query, limit),
            None => Vec::new(),
        }
    }

    pub fn number_of_files(&self) -> usize {
        self.snapshot().map_or(0, |database| database.number_of_files())
    }

    pub fn number_of_folders(&self) -> usize {
        self.snapshot().map_or(0, |database| database.number_of_folders())
    }
}
