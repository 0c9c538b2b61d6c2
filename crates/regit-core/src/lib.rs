//! # regit-core
//!
//! Core types and traits shared by the regit asynchronous-execution
//! primitives.
//!
//! This crate is platform-agnostic and spawns no threads of its own.
//! The worker pool and deferred timer live in `regit-async`.
//!
//! ## Modules
//!
//! - `job` - Job type plus the `ThreadFactory` / `WorkPolicy` capabilities
//! - `lifecycle` - Unstarted/Running/Stopped state machine
//! - `error` - Error types
//! - `env` - Environment variable utilities
//! - `logging` - tracing subscriber setup

pub mod job;
pub mod lifecycle;
pub mod error;
pub mod env;
pub mod logging;

// Re-exports for convenience
pub use job::{job, ExecutionUnit, Job, ThreadFactory, WorkPolicy, WorkerEntry};
pub use lifecycle::{Lifecycle, LifecycleGuard, LifecycleState};
pub use error::{AsyncError, AsyncResult, ConfigError};
pub use env::{env_get, env_get_opt, env_get_str};

/// Limits shared by the pool and timer configs
pub mod constants {
    /// Largest accepted pool size
    pub const MAX_POOL_SIZE: usize = 256;

    /// Cap applied to the auto-detected default pool size
    pub const DEFAULT_POOL_SIZE_CAP: usize = 64;

    /// Smallest accepted explicit stack size for spawned threads
    pub const MIN_STACK_SIZE: usize = 16 * 1024;
}
