//! Basic regit example
//!
//! Starts a worker pool, posts a batch of jobs (one of them failing), then
//! arms the deferred timer to post a follow-up batch into the same pool.
//!
//! # Environment Variables
//!
//! - `REGIT_LOG=debug` - Log filter (falls back to `RUST_LOG`, then `info`)
//! - `REGIT_POOL_SIZE=<n>` - Number of pool workers
//! - `REGIT_POOL_THREAD_NAME`, `REGIT_TIMER_THREAD_NAME` - Thread names

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use regit_async::{AsyncResult, DeferredTimer, LoggingWorkPolicy, PoolBuilder, PoolConfig};
use tracing::{error, info, warn};

const BATCH: usize = 8;

// REGIT_LOG=debug cargo run -p regit-basic
fn main() -> ExitCode {
    regit_core::logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "example failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> AsyncResult<()> {
    let config = PoolConfig::from_env();
    config.validate()?;
    info!(size = config.size, thread_name = %config.thread_name, "starting pool");

    let pool = Arc::new(
        PoolBuilder::from_config(&config)
            .work_policy(LoggingWorkPolicy::new())
            .build()?,
    );
    pool.start();

    let completed = Arc::new(AtomicUsize::new(0));

    for i in 0..BATCH {
        let c = completed.clone();
        pool.post(move || {
            if i == 3 {
                panic!("job {} failed on purpose", i);
            }
            c.fetch_add(1, Ordering::SeqCst);
        });
    }

    let timer = DeferredTimer::new()?;
    let (p, c) = (pool.clone(), completed.clone());
    let armed = timer.post(Duration::from_millis(250), move || {
        info!("timer fired, posting follow-up batch");
        for _ in 0..BATCH {
            let c = c.clone();
            p.post(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
    });
    if !timer.post(Duration::ZERO, || info!("dropped job ran")) {
        info!(armed, "second timer post rejected while the first is pending");
    }

    // One job in the first batch panics.
    let expected = 2 * BATCH - 1;
    let deadline = Instant::now() + Duration::from_secs(10);
    while completed.load(Ordering::SeqCst) < expected {
        if Instant::now() > deadline {
            warn!("timeout waiting for jobs");
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    drop(timer);
    pool.stop();

    info!(
        completed = completed.load(Ordering::SeqCst),
        failures = pool.policy().failures(),
        "example complete"
    );
    Ok(())
}
