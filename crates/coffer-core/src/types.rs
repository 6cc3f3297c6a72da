//! Core types for coffer

use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::{CofferError, Result};

/// A primary or index key value.
///
/// Keys have a total order: all integers sort before all text, and all
/// text before all composite keys; within a variant the natural order
/// applies. Composite keys compare element-wise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// 64-bit signed integer
    Integer(i64),
    /// UTF-8 string
    Text(String),
    /// Ordered list of keys, compared element-wise
    Composite(Vec<Key>),
}

impl Key {
    /// Convert a JSON value into a key, if it has a key-compatible type.
    ///
    /// Integral numbers and strings are keys; arrays of key-compatible
    /// values become composite keys. Everything else (null, bool,
    /// non-integral numbers, objects) is not a valid key.
    pub fn from_json(value: &serde_json::Value) -> Option<Key> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Key::Integer),
            serde_json::Value::String(s) => Some(Key::Text(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Key::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Key::Composite),
            _ => None,
        }
    }

    /// Extract the key stored at `key_path` within an entity.
    ///
    /// Dotted paths descend nested objects (`"meta.id"`). A missing field
    /// or a field whose value is not key-compatible is a store error.
    pub fn extract(entity: &serde_json::Value, key_path: &str) -> Result<Key> {
        let mut current = entity;
        for segment in key_path.split('.') {
            current = current.get(segment).ok_or_else(|| {
                CofferError::Store(format!("entity has no value at key path '{}'", key_path))
            })?;
        }
        Key::from_json(current).ok_or_else(|| {
            CofferError::Store(format!(
                "value at key path '{}' is not a valid key: {}",
                key_path, current
            ))
        })
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Integer(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<Vec<Key>> for Key {
    fn from(value: Vec<Key>) -> Self {
        Key::Composite(value)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Integer(v) => write!(f, "{}", v),
            Key::Text(v) => write!(f, "{}", v),
            Key::Composite(v) => {
                write!(f, "[")?;
                for (i, key) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", key)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A contiguous span of key values a cursor should traverse.
///
/// Either bound may be absent (unbounded on that side) and either bound
/// may independently be open (excluded) or closed (included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    lower: Option<Key>,
    upper: Option<Key>,
    lower_open: bool,
    upper_open: bool,
}

impl KeyRange {
    /// A range matching exactly one key.
    pub fn only(key: impl Into<Key>) -> Self {
        let key = key.into();
        Self {
            lower: Some(key.clone()),
            upper: Some(key),
            lower_open: false,
            upper_open: false,
        }
    }

    /// All keys at or above `lower` (above only, when `open`).
    pub fn lower_bound(lower: impl Into<Key>, open: bool) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: None,
            lower_open: open,
            upper_open: false,
        }
    }

    /// All keys at or below `upper` (below only, when `open`).
    pub fn upper_bound(upper: impl Into<Key>, open: bool) -> Self {
        Self {
            lower: None,
            upper: Some(upper.into()),
            lower_open: false,
            upper_open: open,
        }
    }

    /// All keys between `lower` and `upper`, with each end independently
    /// open or closed.
    pub fn bound(
        lower: impl Into<Key>,
        upper: impl Into<Key>,
        lower_open: bool,
        upper_open: bool,
    ) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
            lower_open,
            upper_open,
        }
    }

    /// Whether `key` falls within this range.
    pub fn contains(&self, key: &Key) -> bool {
        if let Some(lower) = &self.lower {
            if self.lower_open {
                if key <= lower {
                    return false;
                }
            } else if key < lower {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            if self.upper_open {
                if key >= upper {
                    return false;
                }
            } else if key > upper {
                return false;
            }
        }
        true
    }

    /// Whether no key can satisfy the range (inverted bounds, or equal
    /// bounds with either end open).
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => {
                lower > upper || (lower == upper && (self.lower_open || self.upper_open))
            }
            _ => false,
        }
    }

    /// The range as a pair of `Bound`s, usable with ordered-map range
    /// scans. Check `is_empty` first; ordered maps reject inverted ranges.
    pub fn bounds(&self) -> (Bound<&Key>, Bound<&Key>) {
        let lower = match (&self.lower, self.lower_open) {
            (Some(key), true) => Bound::Excluded(key),
            (Some(key), false) => Bound::Included(key),
            (None, _) => Bound::Unbounded,
        };
        let upper = match (&self.upper, self.upper_open) {
            (Some(key), true) => Bound::Excluded(key),
            (Some(key), false) => Bound::Included(key),
            (None, _) => Bound::Unbounded,
        };
        (lower, upper)
    }
}

impl From<Key> for KeyRange {
    /// A single key is treated as an exact-match range.
    fn from(key: Key) -> Self {
        KeyRange::only(key)
    }
}

/// Traversal and ordering direction for cursors and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// The mode a transaction scope is opened in.
///
/// Write operations through a `ReadOnly` scope are transaction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}
