//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a connection pool
///
/// Controls pool sizing, acquisition timeout, and idle-connection lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Minimum number of connections the pool keeps open
    min_connections: usize,
    /// Maximum number of connections allowed in the pool
    max_connections: usize,
    /// Timeout in milliseconds when acquiring a connection from the pool
    acquire_timeout_ms: u64,
    /// Idle duration in milliseconds after which a connection may be reaped
    idle_timeout_ms: u64,
}

impl PoolConfig {
    /// Create a new pool configuration with the given min and max sizes
    ///
    /// # Panics
    ///
    /// Panics if `min_connections` is 0 or exceeds `max_connections`.
    pub fn new(min_connections: usize, max_connections: usize) -> Self {
        assert!(
            min_connections > 0,
            "min_connections must be greater than 0, got {}",
            min_connections
        );
        assert!(
            min_connections <= max_connections,
            "min_connections ({}) cannot exceed max_connections ({})",
            min_connections,
            max_connections
        );

        Self {
            min_connections,
            max_connections,
            acquire_timeout_ms: 5_000,
            idle_timeout_ms: 30_000,
        }
    }

    /// Set the acquire timeout in milliseconds
    ///
    /// # Panics
    ///
    /// Panics if `timeout_ms` is 0.
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        assert!(timeout_ms > 0, "acquire_timeout_ms must be greater than 0");
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Set the idle timeout in milliseconds
    ///
    /// # Panics
    ///
    /// Panics if `timeout_ms` is 0.
    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        assert!(timeout_ms > 0, "idle_timeout_ms must be greater than 0");
        self.idle_timeout_ms = timeout_ms;
        self
    }

    /// Get the minimum pool size
    pub fn min_connections(&self) -> usize {
        self.min_connections
    }

    /// Get the maximum pool size
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Get the acquire timeout as a Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Get the idle timeout as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - min_connections: 2
    /// - max_connections: 5
    /// - acquire_timeout: 5 seconds
    /// - idle_timeout: 30 seconds
    fn default() -> Self {
        Self::new(2, 5)
    }
}
