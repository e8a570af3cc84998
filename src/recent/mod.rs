//! Recent-search history and the key-value port it persists through.

pub mod cache;
pub mod file_store;
pub mod sqlite_store;
pub mod store;

pub use cache::{PendingWrite, RecentQueryCache, RecentQueryEntry, DEFAULT_RECENT_KEY, RECENT_QUERY_LIMIT};
pub use file_store::FileStore;
pub use sqlite_store::SqliteStore;
pub use store::{KeyValueStore, MemoryStore};

use crate::config::{RecentBackend, RecentConfig};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// History shared between the scheduler and the host.
pub type SharedRecent = Arc<Mutex<RecentQueryCache>>;

/// Build the configured store. `data_dir` is used when the config names no path.
pub fn open_store(config: &RecentConfig, data_dir: &std::path::Path) -> Result<Arc<dyn KeyValueStore>> {
    let dir = match config.path.as_deref() {
        Some(path) => PathBuf::from(shellexpand::tilde(path).to_string()),
        None => data_dir.to_path_buf(),
    };
    let store: Arc<dyn KeyValueStore> = match config.backend {
        RecentBackend::Memory => Arc::new(MemoryStore::new()),
        RecentBackend::Sqlite => Arc::new(
            SqliteStore::new(&dir).context("Failed to open SQLite recent-search store")?,
        ),
        RecentBackend::File => {
            let dir = dir.to_string_lossy();
            Arc::new(FileStore::new(&dir).context("Failed to open file recent-search store")?)
        }
    };
    tracing::debug!(backend = ?config.backend, dir = %dir.display(), "opened recent-search store");
    Ok(store)
}
