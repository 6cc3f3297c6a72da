//! Database schema declaration
//!
//! A database is declared as a name, a version, and the collections it
//! contains. The engine provisions missing collections and indexes when a
//! handle is opened with a version above the stored one; declarations for
//! collections that already exist are no-ops.

use serde::{Deserialize, Serialize};

/// Declaration of a secondary index over a collection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name, used to direct cursor scans.
    pub name: String,
    /// Path of the indexed field within each entity.
    pub key_path: String,
    /// Whether two entities may share the same indexed value.
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: &str, key_path: &str) -> Self {
        Self {
            name: name.to_string(),
            key_path: key_path.to_string(),
            unique: false,
        }
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Declaration of a named object collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: String,
    /// Path of the primary key field within each entity.
    pub key_path: String,
    /// Secondary indexes over the collection.
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: &str, key_path: &str) -> Self {
        Self {
            name: name.to_string(),
            key_path: key_path.to_string(),
            indexes: Vec::new(),
        }
    }

    /// Add a secondary index declaration.
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }
}

/// Options identifying and describing a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseOptions {
    /// Database name.
    pub name: String,
    /// Schema version. Raising it triggers provisioning of newly declared
    /// collections and indexes on the next open.
    pub version: u32,
    /// Collections the database contains.
    pub collections: Vec<CollectionSpec>,
}

impl DatabaseOptions {
    pub fn new(name: &str, version: u32) -> Self {
        Self {
            name: name.to_string(),
            version,
            collections: Vec::new(),
        }
    }

    /// Add a collection declaration.
    pub fn with_collection(mut self, collection: CollectionSpec) -> Self {
        self.collections.push(collection);
        self
    }

    /// Look up a collection declaration by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }
}
