//! Default OS-thread execution units

use std::io;
use std::thread::{self, JoinHandle};

use regit_core::{ExecutionUnit, ThreadFactory, WorkerEntry};

use crate::config::PoolConfig;

/// Spawns one named OS thread per execution unit
///
/// Threads are named `{name_prefix}-{index}`.
#[derive(Debug, Clone)]
pub struct OsThreadFactory {
    name_prefix: String,
    stack_size: Option<usize>,
}

impl OsThreadFactory {
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            stack_size: None,
        }
    }

    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self {
            name_prefix: config.thread_name.clone(),
            stack_size: config.stack_size,
        }
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }
}

impl Default for OsThreadFactory {
    fn default() -> Self {
        Self::new(crate::config::defaults::POOL_THREAD_NAME)
    }
}

impl ThreadFactory for OsThreadFactory {
    type Unit = OsThread;

    fn spawn(&self, index: usize, entry: WorkerEntry) -> io::Result<OsThread> {
        let mut builder = thread::Builder::new().name(format!("{}-{}", self.name_prefix, index));

        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        builder.spawn(entry).map(OsThread)
    }
}

/// A spawned OS thread, joined by [`ExecutionUnit::join`]
#[derive(Debug)]
pub struct OsThread(JoinHandle<()>);

impl OsThread {
    pub fn name(&self) -> Option<&str> {
        self.0.thread().name()
    }
}

impl ExecutionUnit for OsThread {
    fn join(self) {
        let name = self.0.thread().name().unwrap_or("<unnamed>").to_owned();
        if self.0.join().is_err() {
            tracing::error!(thread = %name, "execution unit panicked");
        }
    }
}
