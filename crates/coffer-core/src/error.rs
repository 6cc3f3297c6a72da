//! Error types for coffer

use thiserror::Error;

/// Core error type for coffer operations
#[derive(Error, Debug)]
pub enum CofferError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out acquiring a connection: {0}")]
    AcquireTimeout(String),

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CofferError {
    /// Whether this error belongs to the connection-failure family
    /// (engine open failure, pool exhaustion, pool shutdown).
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            CofferError::Connection(_) | CofferError::AcquireTimeout(_) | CofferError::PoolClosed
        )
    }
}

/// Result type alias for coffer operations
pub type Result<T> = std::result::Result<T, CofferError>;
