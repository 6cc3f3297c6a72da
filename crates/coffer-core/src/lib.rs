//! Coffer Core - Core abstractions and traits for pooled object storage
//!
//! This crate provides the fundamental traits and types that all other
//! coffer crates depend on. It defines:
//!
//! - `StorageEngine` - Trait for storage engine implementations
//! - `EngineHandle` - Trait for one open handle onto a database
//! - `TransactionScope` / `CollectionAccess` / `Cursor` - the per-operation
//!   capability surface the store and query layers call into
//! - Common types like `Key`, `KeyRange`, `Direction`, schema declarations
//!   and the error taxonomy

mod engine;
mod error;
mod schema;
mod types;

pub use engine::*;
pub use error::*;
pub use schema::*;
pub use types::*;
