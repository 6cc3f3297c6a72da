//! Typed per-collection store

use std::marker::PhantomData;
use std::sync::Arc;

use coffer_connection::{ConnectionPool, PooledConnection};
use coffer_core::{
    CofferError, CollectionAccess, Cursor, Direction, EngineHandle, Key, KeyRange, Result,
    TransactionMode, TransactionScope,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::QueryBuilder;

/// Typed access to one named collection.
///
/// Every method borrows a connection from the pool, opens one transaction
/// against the bound collection, performs its operation, and releases the
/// connection. Release is the drop of the borrowed connection guard, so it
/// happens on error paths too.
pub struct Store<T> {
    pool: Arc<ConnectionPool>,
    collection: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Store<T> {
    pub(crate) fn new(pool: Arc<ConnectionPool>, collection: &str) -> Self {
        Self {
            pool,
            collection: collection.to_string(),
            _entity: PhantomData,
        }
    }

    /// Name of the collection this store is bound to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Start building a filtered, ordered, paginated read.
    pub fn query(&self) -> QueryBuilder<T> {
        QueryBuilder::new(Arc::clone(&self.pool), self.collection.clone())
    }

    /// One borrow-use-release cycle: acquire a connection, begin a
    /// transaction over the bound collection, and return the access
    /// surface together with the guard that releases the connection when
    /// dropped.
    async fn collection_access(
        &self,
        mode: TransactionMode,
    ) -> Result<(PooledConnection<'_>, Box<dyn CollectionAccess>)> {
        let conn = self.pool.acquire().await?;
        let scope = conn.begin(&[self.collection.as_str()], mode).await?;
        let access = scope.collection(&self.collection)?;
        Ok((conn, access))
    }
}

impl<T> Store<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Upsert one entity by its primary key. Overwriting an existing key
    /// succeeds.
    pub async fn save(&self, entity: T) -> Result<T> {
        let value = serde_json::to_value(&entity)?;
        let (_conn, access) = self.collection_access(TransactionMode::ReadWrite).await?;
        access.put(value).await?;
        Ok(entity)
    }

    /// Upsert a batch of entities within one transaction scope.
    ///
    /// An empty batch resolves immediately without touching the pool or
    /// the engine. The first failing item rejects the whole call; items
    /// that completed before it are not rolled back.
    pub async fn save_many(&self, entities: Vec<T>) -> Result<Vec<T>> {
        if entities.is_empty() {
            return Ok(entities);
        }
        let values: Vec<serde_json::Value> = entities
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<_, _>>()?;

        tracing::debug!(collection = %self.collection, count = values.len(), "saving batch");
        let (_conn, access) = self.collection_access(TransactionMode::ReadWrite).await?;
        for value in values {
            access
                .put(value)
                .await
                .map_err(|e| CofferError::Store(format!("batch save failed: {}", e)))?;
        }
        Ok(entities)
    }

    /// Point lookup by primary key. A miss is `Ok(None)`, not an error.
    pub async fn find_one(&self, key: impl Into<Key>) -> Result<Option<T>> {
        let key = key.into();
        let (_conn, access) = self.collection_access(TransactionMode::ReadOnly).await?;
        match access.get(&key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// All entities in the collection, in primary-key order.
    pub async fn find(&self) -> Result<Vec<T>> {
        let (_conn, access) = self.collection_access(TransactionMode::ReadOnly).await?;
        access
            .get_all()
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(CofferError::from))
            .collect()
    }

    /// Point lookup per key. Keys with no match are silently omitted, so
    /// the result may be shorter than the input.
    pub async fn find_many(&self, keys: Vec<Key>) -> Result<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let (_conn, access) = self.collection_access(TransactionMode::ReadOnly).await?;
        let mut results = Vec::with_capacity(keys.len());
        for key in &keys {
            let found = access
                .get(key)
                .await
                .map_err(|e| CofferError::Query(format!("batch lookup failed: {}", e)))?;
            if let Some(value) = found {
                results.push(serde_json::from_value(value)?);
            }
        }
        Ok(results)
    }

    /// Replace one entity. Same primitive as `save`: the caller supplies
    /// the full replacement value, key included.
    pub async fn update(&self, entity: T) -> Result<T> {
        self.save(entity).await
    }

    /// Replace a batch of entities, with the same batch semantics as
    /// `save_many`.
    pub async fn update_many(&self, entities: Vec<T>) -> Result<Vec<T>> {
        if entities.is_empty() {
            return Ok(entities);
        }
        let values: Vec<serde_json::Value> = entities
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<_, _>>()?;

        let (_conn, access) = self.collection_access(TransactionMode::ReadWrite).await?;
        for value in values {
            access
                .put(value)
                .await
                .map_err(|e| CofferError::Store(format!("batch update failed: {}", e)))?;
        }
        Ok(entities)
    }

    /// Total number of entities in the collection.
    pub async fn count(&self) -> Result<u64> {
        let (_conn, access) = self.collection_access(TransactionMode::ReadOnly).await?;
        access.count().await
    }

    /// Delete by primary key. Removing an absent key is a no-op.
    pub async fn remove(&self, key: impl Into<Key>) -> Result<()> {
        let key = key.into();
        let (_conn, access) = self.collection_access(TransactionMode::ReadWrite).await?;
        access.delete(&key).await
    }

    /// Delete a batch of keys, with the same batch semantics as
    /// `save_many`. An empty key set resolves immediately.
    pub async fn remove_many(&self, keys: Vec<Key>) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let (_conn, access) = self.collection_access(TransactionMode::ReadWrite).await?;
        for key in &keys {
            access
                .delete(key)
                .await
                .map_err(|e| CofferError::Store(format!("batch delete failed: {}", e)))?;
        }
        Ok(())
    }

    /// Delete every entity whose indexed field falls within `range`,
    /// through one cursor walk over the named index.
    #[tracing::instrument(skip(self, range), fields(collection = %self.collection))]
    pub async fn clear_by_index(&self, index: &str, range: KeyRange) -> Result<()> {
        let (_conn, access) = self.collection_access(TransactionMode::ReadWrite).await?;
        let mut cursor = access
            .open_index_cursor(index, Some(range), Direction::Ascending)
            .await?;
        let mut cleared = 0u64;
        while cursor.advance().await?.is_some() {
            cursor.delete().await?;
            cleared += 1;
        }
        tracing::debug!(cleared, "cleared entities by index range");
        Ok(())
    }
}

impl<T> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("collection", &self.collection)
            .finish()
    }
}
