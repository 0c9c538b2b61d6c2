//! # regit-async
//!
//! Two asynchronous-execution primitives on preemptive OS threads:
//!
//! - [`ThreadPool`]: a fixed set of execution units consuming jobs from a
//!   shared FIFO queue, with explicit idempotent `start` / `stop`.
//! - [`DeferredTimer`]: one background thread that runs at most one
//!   delayed job at a time.
//!
//! The two share no state. Compose them freely, e.g. a timer job that
//! posts follow-up work into a pool.
//!
//! ## Quick Start
//!
//! ```ignore
//! use regit_async::{DeferredTimer, ThreadPool};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let pool = Arc::new(ThreadPool::new(4)?);
//! pool.start();
//!
//! let timer = DeferredTimer::new()?;
//! let p = pool.clone();
//! timer.post(Duration::from_secs(1), move || {
//!     p.post(|| println!("queued by the timer"));
//! });
//! ```
//!
//! ## Failure model
//!
//! A job fails by panicking. The pool hands every job to its
//! [`WorkPolicy`]; the default one catches and discards the panic so the
//! worker keeps running. The timer contains job panics the same way.
//! Nothing is reported back to the submitter.

pub mod config;
pub mod policy;
pub mod pool;
pub mod thread;
pub mod timer;

// Re-exports
pub use config::{PoolConfig, TimerConfig};
pub use policy::{DefaultWorkPolicy, LoggingWorkPolicy};
pub use pool::{PoolBuilder, ThreadPool};
pub use thread::{OsThread, OsThreadFactory};
pub use timer::DeferredTimer;

pub use regit_core::{
    job, AsyncError, AsyncResult, ExecutionUnit, Job, LifecycleState, ThreadFactory, WorkPolicy,
    WorkerEntry,
};
