//! In-memory storage engine for coffer
//!
//! Databases live in process memory and are shared by name: every handle
//! opened onto the same name observes the same collections and rows, the
//! way multiple connections to one database do. Nothing is persisted; the
//! engine exists to exercise the pool, store, and query layers end-to-end
//! and to back tests.

mod collection;
mod cursor;
mod engine;

#[cfg(test)]
mod engine_tests;

pub use engine::MemoryEngine;
