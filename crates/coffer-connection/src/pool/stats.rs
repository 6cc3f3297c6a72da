//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a pool's connection accounting
///
/// `capacity` is the configured ceiling on live connections. The live count
/// can sit anywhere at or below it: maintenance shrinks an over-provisioned
/// pool back toward its minimum, and growth only happens on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Configured maximum number of live connections
    capacity: usize,
    /// Connections sitting idle in the pool
    idle: usize,
    /// Connections currently borrowed by in-flight operations
    active: usize,
    /// Acquire calls queued for a connection
    waiting: usize,
}

impl PoolStats {
    /// Create a snapshot from raw counts
    pub fn new(capacity: usize, idle: usize, active: usize, waiting: usize) -> Self {
        Self {
            capacity,
            idle,
            active,
            waiting,
        }
    }

    /// Configured ceiling on live connections
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live connections, idle and busy together
    pub fn total(&self) -> usize {
        self.idle + self.active
    }

    /// Get the number of connections available for immediate acquisition
    pub fn idle(&self) -> usize {
        self.idle
    }

    /// Get the number of active (in-use) connections
    pub fn active(&self) -> usize {
        self.active
    }

    /// Get the number of waiting requests
    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// Fraction of the configured capacity currently borrowed (0.0 to 1.0)
    ///
    /// Returns 0.0 if capacity is 0 to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.active as f64 / self.capacity as f64
        }
    }

    /// Check if every permitted connection is borrowed
    ///
    /// Further acquires queue behind a release once the pool is saturated.
    pub fn is_saturated(&self) -> bool {
        self.capacity > 0 && self.active >= self.capacity
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}
