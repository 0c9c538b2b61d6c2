//! Single-slot deferred-job timer
//!
//! One background thread runs at most one delayed job at a time.
//!
//! # Design
//!
//! The background thread:
//! 1. Announces `ready` once, before its first wait
//! 2. Waits until a job is armed or `stopping` is set
//! 3. Sleeps out the job's interval, runs it, clears the slot
//!
//! The slot stays occupied from `post` until the job has returned, so a
//! second `post` during the interval or the run is rejected, not queued.
//! Each `post` fires once; there is no re-arming and no cancellation.
//!
//! Dropping the timer waits for an armed job to finish before stopping the
//! thread. A job that never returns makes the drop hang.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use regit_core::{AsyncError, AsyncResult, Job};

use crate::config::TimerConfig;
use crate::policy::{panic_message, run_contained};

/// State guarded by the slot mutex
#[derive(Default)]
struct TimerSlot {
    /// Set once by the background thread before it first waits
    ready: bool,
    /// Monotonic false → true
    stopping: bool,
    /// True from acceptance until the job has returned
    has_job: bool,
    interval: Duration,
    job: Option<Job>,
}

struct TimerShared {
    slot: Mutex<TimerSlot>,
    /// Signaled on ready, on arm, on job completion and on stop
    changed: Condvar,
}

/// Runs one job after a delay on a dedicated background thread
///
/// # Example
///
/// ```ignore
/// let timer = DeferredTimer::new()?;
/// timer.post(Duration::from_secs(1), || println!("one second later"));
/// ```
pub struct DeferredTimer {
    shared: Arc<TimerShared>,
    thread: Option<JoinHandle<()>>,
}

impl DeferredTimer {
    /// Timer with the default config (env overrides applied)
    pub fn new() -> AsyncResult<Self> {
        Self::with_config(TimerConfig::from_env())
    }

    /// Spawn the background thread and wait until it is ready for work
    pub fn with_config(config: TimerConfig) -> AsyncResult<Self> {
        config.validate()?;

        let shared = Arc::new(TimerShared {
            slot: Mutex::new(TimerSlot::default()),
            changed: Condvar::new(),
        });

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread_shared = Arc::clone(&shared);
        let handle = builder
            .spawn(move || timer_loop(&thread_shared))
            .map_err(AsyncError::Spawn)?;

        {
            let mut slot = shared.slot.lock();
            shared.changed.wait_while(&mut slot, |s| !s.ready);
        }
        tracing::debug!(thread = %config.thread_name, "deferred timer ready");

        Ok(Self {
            shared,
            thread: Some(handle),
        })
    }

    /// Arm `job` to run once after `interval`
    ///
    /// Returns `false`, dropping `job` unrun, if a job is already armed or
    /// running.
    pub fn post<J>(&self, interval: Duration, job: J) -> bool
    where
        J: FnOnce() + Send + 'static,
    {
        self.post_job(interval, Box::new(job))
    }

    /// [`post`](Self::post) for an already boxed [`Job`]
    pub fn post_job(&self, interval: Duration, job: Job) -> bool {
        {
            let mut slot = self.shared.slot.lock();
            self.shared.changed.wait_while(&mut slot, |s| !s.ready);

            if slot.has_job {
                tracing::trace!(?interval, "timer busy, job dropped");
                return false;
            }

            slot.job = Some(job);
            slot.interval = interval;
            slot.has_job = true;
        }
        self.shared.changed.notify_all();

        tracing::trace!(?interval, "timer armed");
        true
    }

    /// Whether a job is armed or running
    pub fn has_pending(&self) -> bool {
        self.shared.slot.lock().has_job
    }
}

impl Drop for DeferredTimer {
    fn drop(&mut self) {
        {
            let mut slot = self.shared.slot.lock();
            self.shared.changed.wait_while(&mut slot, |s| s.has_job);
            slot.stopping = true;
        }
        self.shared.changed.notify_all();

        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("deferred timer thread panicked");
            }
        }
        tracing::debug!("deferred timer stopped");
    }
}

impl fmt::Debug for DeferredTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTimer")
            .field("has_pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}

/// Background loop: WAITING → {ARMED → WAITING, STOPPED}
fn timer_loop(shared: &TimerShared) {
    {
        let mut slot = shared.slot.lock();
        slot.ready = true;
    }
    shared.changed.notify_all();

    loop {
        let (interval, job) = {
            let mut slot = shared.slot.lock();
            shared
                .changed
                .wait_while(&mut slot, |s| !s.stopping && !s.has_job);

            if slot.stopping {
                break;
            }
            match slot.job.take() {
                Some(job) => (slot.interval, job),
                None => continue,
            }
        };

        thread::sleep(interval);
        if let Err(payload) = run_contained(job) {
            tracing::warn!(reason = %panic_message(&*payload), "timer job failed");
        }

        shared.slot.lock().has_job = false;
        shared.changed.notify_all();
    }
}
