//! Database facade owning the connection pool

use std::sync::Arc;

use coffer_connection::{ConnectionPool, PoolConfig, PoolStats};
use coffer_core::{CofferError, DatabaseOptions, Result, StorageEngine};

use crate::Store;

/// Composition root for one database.
///
/// Owns the connection pool and hands out `Store`s per collection. The
/// pool has no ambient or global instance; its lifetime is this value's,
/// ended by `close()`.
pub struct Database {
    pool: Arc<ConnectionPool>,
}

impl Database {
    /// Open a database against `engine`.
    ///
    /// Pre-warms the pool to its minimum size (which runs the engine's
    /// provisioning step for the declared collections and indexes) and
    /// starts the pool's background maintenance.
    #[tracing::instrument(skip(engine, options, pool_config), fields(database = %options.name))]
    pub async fn open(
        engine: Arc<dyn StorageEngine>,
        options: DatabaseOptions,
        pool_config: PoolConfig,
    ) -> Result<Self> {
        let pool = ConnectionPool::open(pool_config, engine, options).await?;
        Ok(Self { pool })
    }

    /// Get a typed store over one of the declared collections.
    ///
    /// The collection name is validated against the database declaration
    /// here, rather than on first use.
    pub fn store<T>(&self, name: &str) -> Result<Store<T>> {
        if self.pool.options().collection(name).is_none() {
            return Err(CofferError::Store(format!(
                "collection '{}' is not declared for database '{}'",
                name,
                self.pool.options().name
            )));
        }
        Ok(Store::new(Arc::clone(&self.pool), name))
    }

    /// Current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Shut down the pool: queued acquisitions fail with `PoolClosed` and
    /// every connection's handle is closed. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
