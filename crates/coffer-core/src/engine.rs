//! Storage engine capability surface
//!
//! The traits here are the boundary between the pooling/store/query layers
//! and whatever actually holds the data. Every call that touches the engine
//! is an async suspension point; the engine decides what, if anything, it
//! does with that freedom.

use crate::{DatabaseOptions, Direction, Key, KeyRange, Result, TransactionMode};
use async_trait::async_trait;
use std::sync::Arc;

/// A storage engine that can open handles onto named databases.
///
/// Opening a handle with a version above the stored one runs the engine's
/// upgrade step, during which missing collections and indexes from the
/// `DatabaseOptions` are created. Provisioning is idempotent: declaring a
/// collection or index that already exists is a no-op. Opening with a
/// version below the stored one is a connection error.
#[async_trait]
pub trait StorageEngine: Send + Sync + 'static {
    /// Engine identifier (e.g., "memory").
    fn name(&self) -> &'static str;

    /// Open one handle onto the database described by `options`.
    async fn open(&self, options: &DatabaseOptions) -> Result<Arc<dyn EngineHandle>>;
}

/// One open handle onto a database.
///
/// Handles onto the same database name observe the same data. A handle is
/// exclusively borrowed by at most one in-flight operation at a time; the
/// connection pool enforces that discipline.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Name of the engine this handle belongs to.
    fn engine_name(&self) -> &str;

    /// Begin a transaction scope bound to the named collections.
    async fn begin(
        &self,
        collections: &[&str],
        mode: TransactionMode,
    ) -> Result<Box<dyn TransactionScope>>;

    /// Close the handle. Further operations on it fail.
    async fn close(&self) -> Result<()>;

    /// Check if the handle has been closed.
    fn is_closed(&self) -> bool;
}

/// A transaction scope over one or more collections.
pub trait TransactionScope: Send + Sync {
    /// Access one of the collections this scope was opened over.
    ///
    /// Requesting a collection not named at `begin` is a transaction error.
    fn collection(&self, name: &str) -> Result<Box<dyn CollectionAccess>>;
}

/// Operations on a single collection within a transaction scope.
#[async_trait]
pub trait CollectionAccess: Send + Sync {
    /// Point lookup by primary key. A miss is `Ok(None)`.
    async fn get(&self, key: &Key) -> Result<Option<serde_json::Value>>;

    /// All entities in primary-key order.
    async fn get_all(&self) -> Result<Vec<serde_json::Value>>;

    /// Upsert an entity, returning the primary key extracted from it.
    async fn put(&self, entity: serde_json::Value) -> Result<Key>;

    /// Delete by primary key. Deleting an absent key is a no-op.
    async fn delete(&self, key: &Key) -> Result<()>;

    /// Number of entities in the collection.
    async fn count(&self) -> Result<u64>;

    /// Open a cursor over primary keys, optionally restricted to `range`.
    async fn open_cursor(
        &self,
        range: Option<KeyRange>,
        direction: Direction,
    ) -> Result<Box<dyn Cursor>>;

    /// Open a cursor positioned by the named index instead of primary-key
    /// order. Entities without the indexed field are not visited.
    async fn open_index_cursor(
        &self,
        index: &str,
        range: Option<KeyRange>,
        direction: Direction,
    ) -> Result<Box<dyn Cursor>>;
}

/// A stateful, steppable iterator over a collection or index.
///
/// One entry per `advance` call, in the physical order of the chosen key
/// source and direction.
#[async_trait]
pub trait Cursor: Send {
    /// Step to the next entry and return its value, or `None` when the
    /// traversal is exhausted.
    async fn advance(&mut self) -> Result<Option<serde_json::Value>>;

    /// Delete the entry at the current position. Requires a read-write
    /// scope and a preceding successful `advance`.
    async fn delete(&mut self) -> Result<()>;
}

impl std::fmt::Debug for dyn StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("name", &self.name())
            .finish()
    }
}

impl std::fmt::Debug for dyn EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("engine_name", &self.engine_name())
            .finish()
    }
}

impl std::fmt::Debug for dyn TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TransactionScope")
    }
}

impl std::fmt::Debug for dyn CollectionAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CollectionAccess")
    }
}

impl std::fmt::Debug for dyn Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cursor")
    }
}
