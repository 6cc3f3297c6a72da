//! Coffer - pooled, transactional access to named object collections
//!
//! A `Database` owns a bounded connection pool over a pluggable storage
//! engine and hands out typed `Store`s per collection. Every store
//! operation borrows a connection for exactly one transaction and releases
//! it on success and failure alike; reads can be filtered, ordered, and
//! paginated through a `QueryBuilder` that compiles to a single cursor
//! traversal.
//!
//! ```ignore
//! use coffer::{CollectionSpec, Database, DatabaseOptions, IndexSpec, PoolConfig};
//!
//! let options = DatabaseOptions::new("app-db", 1).with_collection(
//!     CollectionSpec::new("users", "id").with_index(IndexSpec::new("by_age", "age")),
//! );
//! let db = Database::open(engine, options, PoolConfig::default()).await?;
//!
//! let users = db.store::<User>("users")?;
//! users.save(User { id: 1, name: "alice".into(), age: 30 }).await?;
//! let adults = users
//!     .query()
//!     .index("by_age")
//!     .where_key(KeyRange::lower_bound(18, false))
//!     .limit(10)
//!     .get_many()
//!     .await?;
//! ```

mod database;
mod query;
mod store;

pub use database::Database;
pub use query::QueryBuilder;
pub use store::Store;

/// Re-export commonly used types from coffer-core and coffer-connection
pub use coffer_connection::{PoolConfig, PoolStats};
pub use coffer_core::{
    CofferError, CollectionSpec, DatabaseOptions, Direction, IndexSpec, Key, KeyRange, Result,
    StorageEngine,
};
