//! Error types for the regit async primitives
//!
//! Errors only surface from constructors. `post`, `start` and `stop` never
//! fail from the caller's point of view.

use std::io;

use thiserror::Error;

/// Result type for constructor-level operations
pub type AsyncResult<T> = Result<T, AsyncError>;

/// Errors that can occur while building a pool or timer
#[derive(Debug, Error)]
pub enum AsyncError {
    /// Configuration failed validation
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    /// The OS refused to create an execution unit
    #[error("failed to spawn execution unit: {0}")]
    Spawn(#[source] io::Error),
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0}")]
    InvalidValue(&'static str),

    #[error("pool size {size} out of range 1..={max}")]
    PoolSize { size: usize, max: usize },
}
