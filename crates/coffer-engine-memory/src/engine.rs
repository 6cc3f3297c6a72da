//! Engine, shared databases, handles, and transaction scopes

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use coffer_core::{
    CofferError, CollectionAccess, DatabaseOptions, EngineHandle, Result, StorageEngine,
    TransactionMode, TransactionScope,
};
use parking_lot::{Mutex, RwLock};

use crate::collection::{MemoryCollection, MemoryCollectionAccess};

/// In-memory storage engine.
///
/// Databases are keyed by name within one engine instance; opening the
/// same name twice yields handles onto the same data.
pub struct MemoryEngine {
    databases: Mutex<HashMap<String, Arc<SharedDb>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            databases: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn open(&self, options: &DatabaseOptions) -> Result<Arc<dyn EngineHandle>> {
        let db = {
            let mut databases = self.databases.lock();
            databases
                .entry(options.name.clone())
                .or_insert_with(|| Arc::new(SharedDb::new()))
                .clone()
        };
        db.upgrade_to(options)?;
        tracing::debug!(database = %options.name, version = options.version, "memory database opened");
        Ok(Arc::new(MemoryHandle {
            db,
            closed: AtomicBool::new(false),
        }))
    }
}

/// The data behind every handle onto one database name.
struct SharedDb {
    version: Mutex<u32>,
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl SharedDb {
    fn new() -> Self {
        Self {
            version: Mutex::new(0),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Version check plus provisioning, the upgrade hook of an open.
    ///
    /// A version above the stored one creates the missing collections and
    /// indexes (existing ones are untouched) and records the new version.
    /// The same version is a plain open; a lower version is refused.
    fn upgrade_to(&self, options: &DatabaseOptions) -> Result<()> {
        let mut version = self.version.lock();
        if options.version < *version {
            return Err(CofferError::Connection(format!(
                "database '{}' is at version {}, cannot open at version {}",
                options.name, *version, options.version
            )));
        }
        if options.version > *version {
            let mut collections = self.collections.write();
            for spec in &options.collections {
                match collections.get(&spec.name) {
                    Some(existing) => existing.ensure_indexes(&spec.indexes),
                    None => {
                        tracing::debug!(collection = %spec.name, "provisioning collection");
                        collections
                            .insert(spec.name.clone(), Arc::new(MemoryCollection::new(spec)));
                    }
                }
            }
            *version = options.version;
        }
        Ok(())
    }
}

/// One open handle onto a shared in-memory database.
struct MemoryHandle {
    db: Arc<SharedDb>,
    closed: AtomicBool,
}

#[async_trait]
impl EngineHandle for MemoryHandle {
    fn engine_name(&self) -> &str {
        "memory"
    }

    async fn begin(
        &self,
        collections: &[&str],
        mode: TransactionMode,
    ) -> Result<Box<dyn TransactionScope>> {
        if self.is_closed() {
            return Err(CofferError::Connection("handle is closed".into()));
        }
        let available = self.db.collections.read();
        let mut scoped = HashMap::new();
        for name in collections {
            let collection = available.get(*name).ok_or_else(|| {
                CofferError::Transaction(format!("unknown collection '{}'", name))
            })?;
            scoped.insert((*name).to_string(), Arc::clone(collection));
        }
        Ok(Box::new(MemoryTransaction {
            collections: scoped,
            mode,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A transaction scope bound to a fixed set of collections.
struct MemoryTransaction {
    collections: HashMap<String, Arc<MemoryCollection>>,
    mode: TransactionMode,
}

impl TransactionScope for MemoryTransaction {
    fn collection(&self, name: &str) -> Result<Box<dyn CollectionAccess>> {
        let collection = self.collections.get(name).ok_or_else(|| {
            CofferError::Transaction(format!(
                "collection '{}' is not part of this transaction",
                name
            ))
        })?;
        Ok(Box::new(MemoryCollectionAccess {
            collection: Arc::clone(collection),
            mode: self.mode,
        }))
    }
}
