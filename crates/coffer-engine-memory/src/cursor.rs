//! Order-preserving cursor over a collection or index snapshot

use std::sync::Arc;

use async_trait::async_trait;
use coffer_core::{CofferError, Cursor, Key, Result, TransactionMode};

use crate::collection::MemoryCollection;

/// Cursor over the primary keys captured when the cursor was opened.
///
/// Each `advance` re-reads the live rows, so entries deleted since the
/// snapshot (including by this cursor) are skipped rather than revisited.
pub(crate) struct MemoryCursor {
    collection: Arc<MemoryCollection>,
    mode: TransactionMode,
    keys: std::vec::IntoIter<Key>,
    current: Option<Key>,
}

impl MemoryCursor {
    pub(crate) fn new(
        collection: Arc<MemoryCollection>,
        keys: Vec<Key>,
        mode: TransactionMode,
    ) -> Self {
        Self {
            collection,
            mode,
            keys: keys.into_iter(),
            current: None,
        }
    }
}

#[async_trait]
impl Cursor for MemoryCursor {
    async fn advance(&mut self) -> Result<Option<serde_json::Value>> {
        for key in self.keys.by_ref() {
            let value = self.collection.rows.read().get(&key).cloned();
            if let Some(value) = value {
                self.current = Some(key);
                return Ok(Some(value));
            }
        }
        self.current = None;
        Ok(None)
    }

    async fn delete(&mut self) -> Result<()> {
        if self.mode != TransactionMode::ReadWrite {
            return Err(CofferError::Transaction(
                "cannot delete through a read-only transaction".into(),
            ));
        }
        let key = self.current.as_ref().ok_or_else(|| {
            CofferError::Query("cursor is not positioned on an entry".into())
        })?;
        self.collection.rows.write().remove(key);
        Ok(())
    }
}
