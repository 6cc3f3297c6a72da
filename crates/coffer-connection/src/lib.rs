//! Coffer Connection - Connection lifecycle and pooling
//!
//! This crate bounds the number of live storage-engine handles, queues
//! callers fairly when the pool is saturated, and reaps idle handles in the
//! background.

pub mod pool;

pub use pool::{ConnectionPool, PoolConfig, PoolStats, PooledConnection};
