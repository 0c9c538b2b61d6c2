//! Fixed-size worker pool
//!
//! `size` execution units consume jobs from one shared FIFO queue. The
//! queue and the `stopping` flag live under a single mutex paired with a
//! condition variable; every wait re-checks its predicate.
//!
//! # Lifecycle
//!
//! ```text
//!   new() ──► Unstarted ──start()──► Running ──stop()/drop──► Stopped
//! ```
//!
//! `start` and `stop` take effect once; repeated or concurrent calls are
//! no-ops, and a concurrent `stop` returns only after the first caller
//! has joined every unit. There is no restart.
//!
//! # Shutdown policy
//!
//! `stop` does not drain. A unit that wakes and sees `stopping` exits even
//! if jobs are still queued; those jobs, and anything posted afterwards,
//! stay in the queue and never run. A job already executing is not
//! interrupted, and `stop` blocks until it returns.
//!
//! Calling `stop` (or dropping the pool) from inside one of its own jobs
//! deadlocks: the unit would be joining itself.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use regit_core::{
    AsyncResult, ExecutionUnit, Job, Lifecycle, LifecycleState, ThreadFactory, WorkPolicy,
};

use crate::config::{validate_pool_size, PoolConfig};
use crate::policy::DefaultWorkPolicy;
use crate::thread::OsThreadFactory;

/// State guarded by the queue mutex
struct QueueState {
    jobs: VecDeque<Job>,
    /// Monotonic false → true
    stopping: bool,
}

/// Shared between the pool handle and its execution units
struct PoolShared<P> {
    queue: Mutex<QueueState>,
    /// Signaled on enqueue (one) and on stop (all)
    available: Condvar,
    policy: P,
    /// Units currently inside the worker loop
    alive: AtomicUsize,
}

/// Bounded pool of execution units draining a shared FIFO queue
///
/// Not `Clone`: the pool exclusively owns its units. Share it by reference
/// or through an `Arc<ThreadPool>`.
///
/// # Example
///
/// ```ignore
/// let pool = ThreadPool::new(3)?;
/// pool.start();
/// pool.post(|| println!("hello from a worker"));
/// pool.stop();
/// ```
pub struct ThreadPool<F = OsThreadFactory, P = DefaultWorkPolicy>
where
    F: ThreadFactory,
    P: WorkPolicy,
{
    shared: Arc<PoolShared<P>>,
    factory: F,
    /// Lock order: `lifecycle` before `units`
    lifecycle: Lifecycle,
    units: Mutex<Vec<F::Unit>>,
    size: usize,
}

impl ThreadPool {
    /// Pool of `size` OS threads with the default work policy
    pub fn new(size: usize) -> AsyncResult<Self> {
        Self::with_config(PoolConfig::new().size(size))
    }

    /// Pool built from a validated [`PoolConfig`]
    pub fn with_config(config: PoolConfig) -> AsyncResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(
            config.size,
            OsThreadFactory::from_config(&config),
            DefaultWorkPolicy,
        ))
    }

    /// Builder for pools with a custom thread factory or work policy
    pub fn builder(size: usize) -> PoolBuilder {
        PoolBuilder::new(size)
    }
}

impl<F, P> ThreadPool<F, P>
where
    F: ThreadFactory,
    P: WorkPolicy,
{
    fn from_parts(size: usize, factory: F, policy: P) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                queue: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    stopping: false,
                }),
                available: Condvar::new(),
                policy,
                alive: AtomicUsize::new(0),
            }),
            factory,
            lifecycle: Lifecycle::new(),
            units: Mutex::new(Vec::with_capacity(size)),
            size,
        }
    }

    /// Create the execution units
    ///
    /// Only the first call has any effect, and none after [`stop`](Self::stop).
    /// A unit the factory fails to create is logged and skipped.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if !lifecycle.try_start() {
            tracing::trace!(state = %lifecycle.state(), "pool start ignored");
            return;
        }

        let mut units = self.units.lock();
        for index in 0..self.size {
            let shared = Arc::clone(&self.shared);
            match self.factory.spawn(index, Box::new(move || worker_loop(&shared, index))) {
                Ok(unit) => units.push(unit),
                Err(err) => {
                    tracing::error!(index, error = %err, "failed to spawn pool worker");
                }
            }
        }

        tracing::debug!(size = self.size, spawned = units.len(), "pool started");
    }

    /// Signal every unit to exit and join them all
    ///
    /// Queued jobs are abandoned, not drained. Idempotent.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let Some(prev) = lifecycle.try_stop() else {
            return;
        };

        self.shared.queue.lock().stopping = true;
        self.shared.available.notify_all();

        let units = std::mem::take(&mut *self.units.lock());
        let joined = units.len();
        for unit in units {
            unit.join();
        }

        let abandoned = self.shared.queue.lock().jobs.len();
        if abandoned > 0 {
            tracing::warn!(abandoned, "pool stopped with queued jobs left unexecuted");
        }
        tracing::debug!(from = %prev, joined, "pool stopped");
    }

    /// Enqueue `job` and wake one idle unit
    ///
    /// Never blocks on running work and never fails. Jobs posted before
    /// [`start`](Self::start) wait in the queue; jobs posted after
    /// [`stop`](Self::stop) are accepted but never run.
    pub fn post<J>(&self, job: J)
    where
        J: FnOnce() + Send + 'static,
    {
        self.post_job(Box::new(job));
    }

    /// [`post`](Self::post) for an already boxed [`Job`]
    pub fn post_job(&self, job: Job) {
        self.shared.queue.lock().jobs.push_back(job);
        self.shared.available.notify_one();
    }

    /// Configured number of execution units
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Lifecycle snapshot
    ///
    /// Never blocks, so jobs may call it while `stop` is joining them.
    /// Reads `Stopped` as soon as `stop` has begun.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Whether `stop` has signaled the units, even if it has not finished joining
    pub fn is_stopping(&self) -> bool {
        self.shared.queue.lock().stopping
    }

    /// Jobs queued and not yet dequeued
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }

    /// Units currently inside their worker loop
    pub fn active_units(&self) -> usize {
        self.shared.alive.load(Ordering::Acquire)
    }

    pub fn policy(&self) -> &P {
        &self.shared.policy
    }
}

impl<F, P> Drop for ThreadPool<F, P>
where
    F: ThreadFactory,
    P: WorkPolicy,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<F, P> fmt::Debug for ThreadPool<F, P>
where
    F: ThreadFactory,
    P: WorkPolicy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("size", &self.size)
            .field("pending", &self.pending())
            .field("active_units", &self.active_units())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ThreadPool`] with pluggable capabilities
pub struct PoolBuilder<F = OsThreadFactory, P = DefaultWorkPolicy> {
    size: usize,
    factory: F,
    policy: P,
}

impl PoolBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            factory: OsThreadFactory::default(),
            policy: DefaultWorkPolicy,
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self {
            size: config.size,
            factory: OsThreadFactory::from_config(config),
            policy: DefaultWorkPolicy,
        }
    }
}

impl<F, P> PoolBuilder<F, P>
where
    F: ThreadFactory,
    P: WorkPolicy,
{
    pub fn thread_factory<F2: ThreadFactory>(self, factory: F2) -> PoolBuilder<F2, P> {
        PoolBuilder {
            size: self.size,
            factory,
            policy: self.policy,
        }
    }

    pub fn work_policy<P2: WorkPolicy>(self, policy: P2) -> PoolBuilder<F, P2> {
        PoolBuilder {
            size: self.size,
            factory: self.factory,
            policy,
        }
    }

    pub fn build(self) -> AsyncResult<ThreadPool<F, P>> {
        validate_pool_size(self.size)?;
        Ok(ThreadPool::from_parts(self.size, self.factory, self.policy))
    }
}

/// Decrements the alive count when a worker loop exits, including by unwinding
struct AliveGuard<'a>(&'a AtomicUsize);

impl<'a> AliveGuard<'a> {
    fn enter(alive: &'a AtomicUsize) -> Self {
        alive.fetch_add(1, Ordering::AcqRel);
        Self(alive)
    }
}

impl Drop for AliveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Per-unit loop: WAITING → {HAS_JOB → WAITING, STOPPED}
fn worker_loop<P: WorkPolicy>(shared: &PoolShared<P>, index: usize) {
    let _alive = AliveGuard::enter(&shared.alive);
    tracing::trace!(index, "pool worker started");

    loop {
        let job = {
            let mut queue = shared.queue.lock();
            shared
                .available
                .wait_while(&mut queue, |q| !q.stopping && q.jobs.is_empty());

            if queue.stopping {
                break;
            }
            match queue.jobs.pop_front() {
                Some(job) => job,
                None => continue,
            }
        };

        shared.policy.begin_work(job);
    }

    tracing::trace!(index, "pool worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::LoggingWorkPolicy;
    use regit_core::constants::MAX_POOL_SIZE;
    use regit_core::{AsyncError, ConfigError};
    use std::io;
    use std::sync::mpsc;
    use std::thread::{self, JoinHandle};
    use std::time::{Duration, Instant};

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    fn incrementer(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Spawns std threads and counts spawns and loop exits
    #[derive(Default, Clone)]
    struct RecordingFactory {
        spawned: Arc<AtomicUsize>,
        exited: Arc<AtomicUsize>,
    }

    impl ThreadFactory for RecordingFactory {
        type Unit = JoinHandle<()>;

        fn spawn(&self, index: usize, entry: regit_core::WorkerEntry) -> io::Result<JoinHandle<()>> {
            self.spawned.fetch_add(1, Ordering::SeqCst);
            let exited = self.exited.clone();
            thread::Builder::new()
                .name(format!("rec-{}", index))
                .spawn(move || {
                    entry();
                    exited.fetch_add(1, Ordering::SeqCst);
                })
        }
    }

    #[test]
    fn test_one_thread() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::new(1).unwrap();

        pool.start();
        for _ in 0..5 {
            pool.post(incrementer(&counter));
        }
        assert!(wait_until(Duration::from_secs(5), || counter.load(Ordering::SeqCst) == 5));
        pool.stop();

        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_multiple_threads() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::new(3).unwrap();

        pool.start();
        for _ in 0..5 {
            pool.post(incrementer(&counter));
        }
        thread::sleep(Duration::from_millis(10));
        assert!(wait_until(Duration::from_secs(5), || pool.pending() == 0
            && counter.load(Ordering::SeqCst) == 5));
        pool.stop();

        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(pool.active_units(), 0);
    }

    #[test]
    fn test_single_worker_preserves_submission_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = ThreadPool::new(1).unwrap();
        pool.start();

        for i in 0..100 {
            let seen = seen.clone();
            pool.post(move || seen.lock().push(i));
        }
        assert!(wait_until(Duration::from_secs(5), || seen.lock().len() == 100));
        pool.stop();

        assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_jobs_posted_before_start_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::new(2).unwrap();

        for _ in 0..10 {
            pool.post(incrementer(&counter));
        }
        assert_eq!(pool.pending(), 10);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        pool.start();
        assert!(wait_until(Duration::from_secs(5), || counter.load(Ordering::SeqCst) == 10));
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_concurrent_start_and_stop_take_effect_once() {
        let factory = RecordingFactory::default();
        let pool = Arc::new(
            ThreadPool::builder(4)
                .thread_factory(factory.clone())
                .build()
                .unwrap(),
        );

        let starters: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || pool.start())
            })
            .collect();
        for h in starters {
            h.join().unwrap();
        }
        assert_eq!(factory.spawned.load(Ordering::SeqCst), 4);
        assert!(pool.is_running());
        assert!(wait_until(Duration::from_secs(5), || pool.active_units() == 4));

        let stoppers: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || {
                    pool.stop();
                    // Every caller returns only once all units are gone.
                    pool.active_units()
                })
            })
            .collect();
        for h in stoppers {
            assert_eq!(h.join().unwrap(), 0);
        }

        assert_eq!(factory.exited.load(Ordering::SeqCst), 4);
        assert_eq!(pool.state(), LifecycleState::Stopped);

        pool.start();
        assert_eq!(factory.spawned.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_jobs_posted_after_stop_never_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::new(2).unwrap();
        pool.start();
        pool.stop();

        pool.post(incrementer(&counter));
        thread::sleep(Duration::from_millis(50));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(pool.pending(), 1);
        assert_eq!(pool.active_units(), 0);
    }

    #[test]
    fn test_stop_abandons_queued_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(ThreadPool::new(1).unwrap());
        pool.start();

        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        pool.post(move || {
            started_tx.send(()).unwrap();
            let _ = gate_rx.recv();
        });
        started_rx.recv().unwrap();

        for _ in 0..3 {
            pool.post(incrementer(&counter));
        }

        let stopper = {
            let pool = pool.clone();
            thread::spawn(move || pool.stop())
        };
        assert!(wait_until(Duration::from_secs(5), || pool.is_stopping()));
        gate_tx.send(()).unwrap();
        stopper.join().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(pool.pending(), 3);
    }

    #[test]
    fn test_failing_job_does_not_stop_worker() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::builder(1)
            .work_policy(LoggingWorkPolicy::new())
            .build()
            .unwrap();
        pool.start();

        pool.post(|| panic!("job failure"));
        pool.post(incrementer(&counter));
        pool.post(|| panic!("another job failure"));
        pool.post(incrementer(&counter));

        assert!(wait_until(Duration::from_secs(5), || counter.load(Ordering::SeqCst) == 2));
        assert_eq!(pool.policy().failures(), 2);
        assert_eq!(pool.active_units(), 1);
    }

    #[test]
    fn test_default_policy_survives_panics() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::new(2).unwrap();
        pool.start();

        for _ in 0..4 {
            pool.post(|| panic!("ignored"));
            pool.post(incrementer(&counter));
        }

        assert!(wait_until(Duration::from_secs(5), || counter.load(Ordering::SeqCst) == 4));
        assert_eq!(pool.active_units(), 2);
    }

    #[test]
    fn test_stop_before_start() {
        let factory = RecordingFactory::default();
        let pool = ThreadPool::builder(2)
            .thread_factory(factory.clone())
            .build()
            .unwrap();

        pool.stop();
        pool.start();

        assert_eq!(pool.state(), LifecycleState::Stopped);
        assert_eq!(factory.spawned.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_stops_and_joins() {
        let factory = RecordingFactory::default();
        {
            let pool = ThreadPool::builder(3)
                .thread_factory(factory.clone())
                .build()
                .unwrap();
            pool.start();
        }
        assert_eq!(factory.spawned.load(Ordering::SeqCst), 3);
        assert_eq!(factory.exited.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_closure_policy() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::new(AtomicUsize::new(0));

        let inv = invoked.clone();
        let pool = ThreadPool::builder(2)
            .work_policy(move |job: Job| {
                inv.fetch_add(1, Ordering::SeqCst);
                job();
            })
            .build()
            .unwrap();
        pool.start();

        for _ in 0..6 {
            pool.post(incrementer(&counter));
        }
        assert!(wait_until(Duration::from_secs(5), || counter.load(Ordering::SeqCst) == 6));
        assert_eq!(invoked.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_partial_spawn_failure() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::builder(3)
            .thread_factory(|index: usize, entry: regit_core::WorkerEntry| {
                if index == 1 {
                    return Err(io::Error::new(io::ErrorKind::Other, "refused"));
                }
                thread::Builder::new().spawn(entry)
            })
            .build()
            .unwrap();
        pool.start();

        for _ in 0..10 {
            pool.post(incrementer(&counter));
        }
        assert!(wait_until(Duration::from_secs(5), || counter.load(Ordering::SeqCst) == 10));
        assert!(wait_until(Duration::from_secs(5), || pool.active_units() == 2));
    }

    #[test]
    fn test_concurrent_posters() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(ThreadPool::new(4).unwrap());
        pool.start();

        let posters: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        pool.post(incrementer(&counter));
                    }
                })
            })
            .collect();
        for h in posters {
            h.join().unwrap();
        }

        assert!(wait_until(Duration::from_secs(10), || counter.load(Ordering::SeqCst) == 1000));
    }

    #[test]
    fn test_invalid_size() {
        assert!(ThreadPool::new(0).is_err());
        let err = ThreadPool::builder(MAX_POOL_SIZE + 1).build().unwrap_err();
        assert!(matches!(
            err,
            AsyncError::Config(ConfigError::PoolSize { size, max })
                if size == MAX_POOL_SIZE + 1 && max == MAX_POOL_SIZE
        ));
    }

    #[test]
    fn test_job_observes_state_during_stop() {
        let pool = Arc::new(ThreadPool::new(1).unwrap());
        pool.start();

        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (seen_tx, seen_rx) = mpsc::channel();
        let p = pool.clone();
        pool.post(move || {
            started_tx.send(()).unwrap();
            let _ = gate_rx.recv();
            seen_tx.send((p.is_running(), p.state())).unwrap();
        });
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let stopper = {
            let pool = pool.clone();
            thread::spawn(move || {
                pool.stop();
                done_tx.send(()).unwrap();
            })
        };
        assert!(wait_until(Duration::from_secs(5), || pool.is_stopping()));
        gate_tx.send(()).unwrap();

        let (running, state) = seen_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!running);
        assert_eq!(state, LifecycleState::Stopped);

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        stopper.join().unwrap();
        assert_eq!(pool.active_units(), 0);
    }

    #[test]
    fn test_named_workers_from_config() {
        let pool = ThreadPool::with_config(PoolConfig::new().size(1).thread_name("named")).unwrap();
        pool.start();

        let (tx, rx) = mpsc::channel();
        pool.post(move || {
            tx.send(thread::current().name().map(str::to_owned)).unwrap();
        });

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("named-0"));
    }
}
