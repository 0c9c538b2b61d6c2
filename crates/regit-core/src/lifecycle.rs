//! Start/stop lifecycle state machine
//!
//! ```text
//!   Unstarted ──try_start──► Running ──try_stop──► Stopped
//!       │                                            ▲
//!       └──────────────────try_stop──────────────────┘
//! ```
//!
//! Transitions are monotonic and `Stopped` is terminal. Owners that need
//! "run exactly once, block concurrent callers until done" semantics hold
//! the guard from [`Lifecycle::lock`] for the duration of the transition.
//!
//! The current state is also published to an atomic, so [`Lifecycle::state`]
//! never waits on a transition in progress.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{Mutex, MutexGuard};

/// Lifecycle state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// Configured, no execution units yet
    Unstarted = 0,

    /// Execution units created
    Running = 1,

    /// Stop requested; terminal
    Stopped = 2,
}

impl LifecycleState {
    #[inline]
    pub const fn is_running(&self) -> bool {
        matches!(self, LifecycleState::Running)
    }

    #[inline]
    pub const fn is_stopped(&self) -> bool {
        matches!(self, LifecycleState::Stopped)
    }
}

impl From<u8> for LifecycleState {
    fn from(v: u8) -> Self {
        match v {
            0 => LifecycleState::Unstarted,
            1 => LifecycleState::Running,
            _ => LifecycleState::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Unstarted => write!(f, "unstarted"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Lifecycle cell: serialized transitions, lock-free reads
#[derive(Debug)]
pub struct Lifecycle {
    /// Held across a whole transition
    transition: Mutex<()>,
    /// Written only while `transition` is held
    state: AtomicU8,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            transition: Mutex::new(()),
            state: AtomicU8::new(LifecycleState::Unstarted as u8),
        }
    }

    /// Snapshot of the current state; never blocks
    #[inline]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }

    /// Take the transition lock
    ///
    /// Concurrent callers of [`LifecycleGuard::try_start`] /
    /// [`LifecycleGuard::try_stop`] serialize here.
    pub fn lock(&self) -> LifecycleGuard<'_> {
        LifecycleGuard {
            _transition: self.transition.lock(),
            state: &self.state,
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Held lifecycle lock; transitions made through it are atomic w.r.t. other callers
pub struct LifecycleGuard<'a> {
    _transition: MutexGuard<'a, ()>,
    state: &'a AtomicU8,
}

impl LifecycleGuard<'_> {
    #[inline]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }

    fn set(&mut self, next: LifecycleState) {
        self.state.store(next as u8, Ordering::Release);
    }

    /// `Unstarted → Running`, returns whether this call made the transition
    pub fn try_start(&mut self) -> bool {
        if self.state() != LifecycleState::Unstarted {
            return false;
        }
        self.set(LifecycleState::Running);
        true
    }

    /// `Unstarted | Running → Stopped`, returns the state left behind
    pub fn try_stop(&mut self) -> Option<LifecycleState> {
        match self.state() {
            LifecycleState::Stopped => None,
            prev => {
                self.set(LifecycleState::Stopped);
                Some(prev)
            }
        }
    }
}
