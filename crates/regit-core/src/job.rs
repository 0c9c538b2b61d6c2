//! Units of work and the capabilities that run them
//!
//! A [`Job`] is an opaque, zero-argument closure with no result. The pool
//! and timer never look inside one.
//!
//! Two capabilities decouple *where* a job runs from *how* it is invoked:
//!
//! - [`ThreadFactory`]: turns a worker loop entry point into a running
//!   [`ExecutionUnit`]. Swap it to name threads, pin them, or run them
//!   under a simulated scheduler in tests.
//! - [`WorkPolicy`]: invokes a dequeued job and decides what happens when
//!   it panics.
//!
//! Both are implemented for plain closures, so ad-hoc customisation needs
//! no new types:
//!
//! ```ignore
//! let factory = |index: usize, entry: WorkerEntry| {
//!     std::thread::Builder::new().name(format!("io-{index}")).spawn(entry)
//! };
//! let policy = |job: Job| job();
//! ```

use std::io;
use std::thread::JoinHandle;

/// A zero-argument unit of work with no propagated result
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Entry point handed to a [`ThreadFactory`]; runs one worker loop to completion
pub type WorkerEntry = Box<dyn FnOnce() + Send + 'static>;

/// Box a closure as a [`Job`]
#[inline]
pub fn job<F>(f: F) -> Job
where
    F: FnOnce() + Send + 'static,
{
    Box::new(f)
}

/// Handle to one running execution unit
pub trait ExecutionUnit: Send + 'static {
    /// Block until the unit has terminated
    fn join(self);
}

impl ExecutionUnit for JoinHandle<()> {
    fn join(self) {
        // A panicking worker loop has already been reported by the panic hook.
        let _ = JoinHandle::join(self);
    }
}

/// Creates execution units bound to a worker loop entry point
pub trait ThreadFactory: Send + Sync + 'static {
    /// Handle type produced for each unit
    type Unit: ExecutionUnit;

    /// Start a unit running `entry`
    ///
    /// `index` is the position of the unit within its owner (0-based).
    fn spawn(&self, index: usize, entry: WorkerEntry) -> io::Result<Self::Unit>;
}

impl<F, U> ThreadFactory for F
where
    F: Fn(usize, WorkerEntry) -> io::Result<U> + Send + Sync + 'static,
    U: ExecutionUnit,
{
    type Unit = U;

    fn spawn(&self, index: usize, entry: WorkerEntry) -> io::Result<U> {
        self(index, entry)
    }
}

/// Strategy governing how a dequeued job is invoked
///
/// Implementations must not let a job's panic escape if the worker loop is
/// expected to survive it.
pub trait WorkPolicy: Send + Sync + 'static {
    fn begin_work(&self, job: Job);
}

impl<F> WorkPolicy for F
where
    F: Fn(Job) + Send + Sync + 'static,
{
    fn begin_work(&self, job: Job) {
        self(job)
    }
}
