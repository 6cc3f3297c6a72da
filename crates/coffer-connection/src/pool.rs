//! Connection pooling for storage-engine handles
//!
//! This module provides connection pooling functionality with configurable
//! pool sizes, timeouts, background idle reaping, and statistics tracking.
//!
//! # Example
//!
//! ```ignore
//! use coffer_connection::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(2, 5)
//!     .with_acquire_timeout_ms(5000)
//!     .with_idle_timeout_ms(30000);
//!
//! let pool = ConnectionPool::open(config, engine, options).await?;
//! let conn = pool.acquire().await?;
//! // Use connection...
//! // Connection returned to pool on drop
//! ```

mod config;
mod pool;
mod stats;

#[cfg(test)]
mod tests;

pub use config::PoolConfig;
pub use pool::{ConnectionPool, PooledConnection};
pub use stats::PoolStats;
