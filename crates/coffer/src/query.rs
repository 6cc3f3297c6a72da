//! Fluent query building compiled to one cursor traversal

use std::marker::PhantomData;
use std::sync::Arc;

use coffer_connection::ConnectionPool;
use coffer_core::{
    CollectionAccess, Cursor, Direction, EngineHandle, KeyRange, Result, TransactionMode,
    TransactionScope,
};
use serde::de::DeserializeOwned;

/// A filter/sort/paginate specification over one collection.
///
/// Chained calls consume and return the builder, and the terminal methods
/// consume it for good, so a half-built query can never be shared or
/// executed twice. Traversal order is exactly the physical order of the
/// chosen index (or the primary key) in the requested direction; offset
/// and limit apply after that ordering.
pub struct QueryBuilder<T> {
    pool: Arc<ConnectionPool>,
    collection: String,
    range: Option<KeyRange>,
    index: Option<String>,
    direction: Direction,
    offset: Option<usize>,
    limit: Option<usize>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> QueryBuilder<T> {
    pub(crate) fn new(pool: Arc<ConnectionPool>, collection: String) -> Self {
        Self {
            pool,
            collection,
            range: None,
            index: None,
            direction: Direction::Ascending,
            offset: None,
            limit: None,
            _entity: PhantomData,
        }
    }

    /// Restrict the scan to a key or key range. A single key matches
    /// exactly.
    pub fn where_key(mut self, range: impl Into<KeyRange>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Scan through the named secondary index instead of primary-key
    /// order.
    pub fn index(mut self, name: &str) -> Self {
        self.index = Some(name.to_string());
        self
    }

    /// Set the traversal direction.
    pub fn order_by(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Skip the first `n` matches before collecting.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    /// Cap the number of collected matches. A limit of zero collects
    /// nothing.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

impl<T> QueryBuilder<T>
where
    T: DeserializeOwned + Send + Sync,
{
    /// Execute the query with exactly one cursor traversal.
    pub async fn get_many(self) -> Result<Vec<T>> {
        let conn = self.pool.acquire().await?;
        let scope = conn
            .begin(&[self.collection.as_str()], TransactionMode::ReadOnly)
            .await?;
        let access = scope.collection(&self.collection)?;

        let mut cursor = match &self.index {
            Some(index) => {
                access
                    .open_index_cursor(index, self.range.clone(), self.direction)
                    .await?
            }
            None => access.open_cursor(self.range.clone(), self.direction).await?,
        };

        let mut results = Vec::new();
        let mut skipped = 0;
        while let Some(value) = cursor.advance().await? {
            if let Some(offset) = self.offset {
                if skipped < offset {
                    skipped += 1;
                    continue;
                }
            }
            if let Some(limit) = self.limit {
                if results.len() >= limit {
                    break;
                }
            }
            results.push(serde_json::from_value(value)?);
        }
        Ok(results)
    }

    /// Execute and take the first result, or `None` if nothing matched.
    pub async fn get_one(self) -> Result<Option<T>> {
        let results = self.limit(1).get_many().await?;
        Ok(results.into_iter().next())
    }
}
