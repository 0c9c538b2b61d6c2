//! Stock work policies
//!
//! A job "fails" by panicking. Both policies here contain the panic so
//! the worker loop that dequeued the job keeps running.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use regit_core::{Job, WorkPolicy};

/// Run the job, discard any panic
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultWorkPolicy;

impl WorkPolicy for DefaultWorkPolicy {
    fn begin_work(&self, job: Job) {
        if let Err(payload) = run_contained(job) {
            tracing::debug!(reason = %panic_message(&*payload), "job failed, discarded");
        }
    }
}

/// Run the job, log and count panics
#[derive(Debug, Default)]
pub struct LoggingWorkPolicy {
    failures: AtomicU64,
}

impl LoggingWorkPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs that panicked so far
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl WorkPolicy for LoggingWorkPolicy {
    fn begin_work(&self, job: Job) {
        if let Err(payload) = run_contained(job) {
            let total = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(reason = %panic_message(&*payload), failures = total, "job failed");
        }
    }
}

/// Invoke `job`, catching an unwinding panic
///
/// The job is consumed either way, so no state it captured is observed
/// after a panic.
pub(crate) fn run_contained(job: Job) -> Result<(), Box<dyn Any + Send>> {
    panic::catch_unwind(AssertUnwindSafe(job))
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
