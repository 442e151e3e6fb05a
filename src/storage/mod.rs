//! Target stores for targets and fetch history
//!
//! The scheduler never talks to a database directly: it receives an
//! `Arc<dyn TargetStore>` at construction and uses the narrow contract
//! defined in [`backend`].
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database, persisted across restarts
//! - **In-Memory**: No persistence, for testing or throwaway runs
//!
//! ## Usage
//!
//! ```no_run
//! use uptime_fetcher::storage::{TargetStore, sqlite::SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::new("./fetcher.db").await?;
//!     let targets = store.list_targets().await?;
//!     println!("{} targets registered", targets.len());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, TargetStore};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use schema::{HistoryRecord, NewTarget, Target, TargetId};

/// Open the store described by the configuration
pub async fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn TargetStore>> {
    match config {
        StorageConfig::None => {
            info!("using in-memory store, targets will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => Ok(Arc::new(sqlite::SqliteStore::new(path).await?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => Err(StorageError::ConnectionFailed(
            "built without the storage-sqlite feature".to_string(),
        )),
    }
}
