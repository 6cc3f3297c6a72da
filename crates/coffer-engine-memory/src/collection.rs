//! Collections and the per-transaction access surface

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use coffer_core::{
    CofferError, CollectionAccess, CollectionSpec, Cursor, Direction, IndexSpec, Key, KeyRange,
    Result, TransactionMode,
};
use parking_lot::RwLock;

use crate::cursor::MemoryCursor;

/// Walk a dotted path into a JSON entity. Missing segments yield `None`
/// rather than an error; an entity without an indexed field simply has no
/// entry in that index.
pub(crate) fn value_at_path<'v>(
    entity: &'v serde_json::Value,
    path: &str,
) -> Option<&'v serde_json::Value> {
    let mut current = entity;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// One named collection: rows in primary-key order plus index declarations.
pub(crate) struct MemoryCollection {
    pub(crate) name: String,
    pub(crate) key_path: String,
    pub(crate) indexes: RwLock<Vec<IndexSpec>>,
    pub(crate) rows: RwLock<BTreeMap<Key, serde_json::Value>>,
}

impl MemoryCollection {
    pub(crate) fn new(spec: &CollectionSpec) -> Self {
        Self {
            name: spec.name.clone(),
            key_path: spec.key_path.clone(),
            indexes: RwLock::new(spec.indexes.clone()),
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add declarations for indexes that do not exist yet. Re-declaring an
    /// existing index is a no-op.
    pub(crate) fn ensure_indexes(&self, specs: &[IndexSpec]) {
        let mut indexes = self.indexes.write();
        for spec in specs {
            if !indexes.iter().any(|i| i.name == spec.name) {
                indexes.push(spec.clone());
            }
        }
    }

    fn index(&self, name: &str) -> Result<IndexSpec> {
        self.indexes
            .read()
            .iter()
            .find(|i| i.name == name)
            .cloned()
            .ok_or_else(|| {
                CofferError::Query(format!(
                    "collection '{}' has no index '{}'",
                    self.name, name
                ))
            })
    }

    /// The index key of an entity, if it has one.
    pub(crate) fn index_key(entity: &serde_json::Value, key_path: &str) -> Option<Key> {
        value_at_path(entity, key_path).and_then(Key::from_json)
    }
}

/// Access to one collection through a transaction scope.
pub(crate) struct MemoryCollectionAccess {
    pub(crate) collection: Arc<MemoryCollection>,
    pub(crate) mode: TransactionMode,
}

impl MemoryCollectionAccess {
    fn require_writable(&self) -> Result<()> {
        match self.mode {
            TransactionMode::ReadWrite => Ok(()),
            TransactionMode::ReadOnly => Err(CofferError::Transaction(format!(
                "cannot write to collection '{}' through a read-only transaction",
                self.collection.name
            ))),
        }
    }
}

#[async_trait]
impl CollectionAccess for MemoryCollectionAccess {
    async fn get(&self, key: &Key) -> Result<Option<serde_json::Value>> {
        Ok(self.collection.rows.read().get(key).cloned())
    }

    async fn get_all(&self) -> Result<Vec<serde_json::Value>> {
        Ok(self.collection.rows.read().values().cloned().collect())
    }

    async fn put(&self, entity: serde_json::Value) -> Result<Key> {
        self.require_writable()?;
        let key = Key::extract(&entity, &self.collection.key_path)?;

        let indexes = self.collection.indexes.read();
        let mut rows = self.collection.rows.write();
        for index in indexes.iter().filter(|i| i.unique) {
            let Some(candidate) = MemoryCollection::index_key(&entity, &index.key_path) else {
                continue;
            };
            let clash = rows.iter().any(|(existing_key, row)| {
                *existing_key != key
                    && MemoryCollection::index_key(row, &index.key_path).as_ref()
                        == Some(&candidate)
            });
            if clash {
                return Err(CofferError::Store(format!(
                    "unique index '{}' already contains {}",
                    index.name, candidate
                )));
            }
        }

        rows.insert(key.clone(), entity);
        Ok(key)
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.require_writable()?;
        self.collection.rows.write().remove(key);
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.collection.rows.read().len() as u64)
    }

    async fn open_cursor(
        &self,
        range: Option<KeyRange>,
        direction: Direction,
    ) -> Result<Box<dyn Cursor>> {
        let mut keys: Vec<Key> = {
            let rows = self.collection.rows.read();
            match &range {
                Some(range) if range.is_empty() => Vec::new(),
                Some(range) => rows.range(range.bounds()).map(|(k, _)| k.clone()).collect(),
                None => rows.keys().cloned().collect(),
            }
        };
        if direction == Direction::Descending {
            keys.reverse();
        }
        Ok(Box::new(MemoryCursor::new(
            Arc::clone(&self.collection),
            keys,
            self.mode,
        )))
    }

    async fn open_index_cursor(
        &self,
        index: &str,
        range: Option<KeyRange>,
        direction: Direction,
    ) -> Result<Box<dyn Cursor>> {
        let spec = self.collection.index(index)?;

        // Entries ordered by indexed value, primary key breaking ties.
        let mut pairs: Vec<(Key, Key)> = {
            let rows = self.collection.rows.read();
            rows.iter()
                .filter_map(|(primary, row)| {
                    let indexed = MemoryCollection::index_key(row, &spec.key_path)?;
                    if range.as_ref().is_none_or(|r| r.contains(&indexed)) {
                        Some((indexed, primary.clone()))
                    } else {
                        None
                    }
                })
                .collect()
        };
        pairs.sort();
        if direction == Direction::Descending {
            pairs.reverse();
        }

        let keys = pairs.into_iter().map(|(_, primary)| primary).collect();
        Ok(Box::new(MemoryCursor::new(
            Arc::clone(&self.collection),
            keys,
            self.mode,
        )))
    }
}
