//! Pool and timer configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()`)
//! 3. Library defaults (`new()`)
//!
//! # Example
//!
//! ```rust,ignore
//! use regit_async::config::PoolConfig;
//!
//! let config = PoolConfig::from_env()
//!     .size(8)
//!     .thread_name("ingest");
//! ```

use regit_core::constants::{DEFAULT_POOL_SIZE_CAP, MAX_POOL_SIZE, MIN_STACK_SIZE};
use regit_core::env::{env_get, env_get_opt, env_get_str};
use regit_core::ConfigError;

pub mod defaults {
    pub const POOL_THREAD_NAME: &str = "regit-worker";
    pub const TIMER_THREAD_NAME: &str = "regit-timer";

    /// Available parallelism, capped
    pub fn pool_size() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(super::DEFAULT_POOL_SIZE_CAP)
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of execution units; fixed for the pool's lifetime
    pub size: usize,
    /// Thread name prefix; units are named `{thread_name}-{index}`
    pub thread_name: String,
    /// Stack size per worker thread (None = system default)
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `REGIT_POOL_SIZE` - Number of worker threads
    /// - `REGIT_POOL_THREAD_NAME` - Thread name prefix
    /// - `REGIT_POOL_STACK_SIZE` - Stack size in bytes
    pub fn from_env() -> Self {
        Self::from_env_prefix("REGIT_POOL")
    }

    fn from_env_prefix(prefix: &str) -> Self {
        Self {
            size: env_get(&format!("{prefix}_SIZE"), defaults::pool_size()),
            thread_name: env_get_str(&format!("{prefix}_THREAD_NAME"), defaults::POOL_THREAD_NAME),
            stack_size: env_get_opt(&format!("{prefix}_STACK_SIZE")),
        }
    }

    /// Create config with explicit defaults (no env override).
    pub fn new() -> Self {
        Self {
            size: defaults::pool_size(),
            thread_name: defaults::POOL_THREAD_NAME.into(),
            stack_size: None,
        }
    }

    // Builder methods

    pub fn size(mut self, n: usize) -> Self {
        self.size = n;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pool_size(self.size)?;
        if self.thread_name.is_empty() {
            return Err(ConfigError::InvalidValue("pool thread_name must not be empty"));
        }
        validate_stack_size(self.stack_size)
    }
}

/// Deferred timer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Name of the background thread
    pub thread_name: String,
    /// Stack size for the background thread (None = system default)
    pub stack_size: Option<usize>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl TimerConfig {
    /// Environment variables (all optional):
    /// - `REGIT_TIMER_THREAD_NAME` - Background thread name
    /// - `REGIT_TIMER_STACK_SIZE` - Stack size in bytes
    pub fn from_env() -> Self {
        Self::from_env_prefix("REGIT_TIMER")
    }

    fn from_env_prefix(prefix: &str) -> Self {
        Self {
            thread_name: env_get_str(&format!("{prefix}_THREAD_NAME"), defaults::TIMER_THREAD_NAME),
            stack_size: env_get_opt(&format!("{prefix}_STACK_SIZE")),
        }
    }

    pub fn new() -> Self {
        Self {
            thread_name: defaults::TIMER_THREAD_NAME.into(),
            stack_size: None,
        }
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name.is_empty() {
            return Err(ConfigError::InvalidValue("timer thread_name must not be empty"));
        }
        validate_stack_size(self.stack_size)
    }
}

/// Pool size must be in `1..=MAX_POOL_SIZE`
pub(crate) fn validate_pool_size(size: usize) -> Result<(), ConfigError> {
    if size == 0 || size > MAX_POOL_SIZE {
        return Err(ConfigError::PoolSize {
            size,
            max: MAX_POOL_SIZE,
        });
    }
    Ok(())
}

fn validate_stack_size(stack_size: Option<usize>) -> Result<(), ConfigError> {
    match stack_size {
        Some(size) if size < MIN_STACK_SIZE => {
            Err(ConfigError::InvalidValue("stack_size must be >= 16KB"))
        }
        _ => Ok(()),
    }
}
