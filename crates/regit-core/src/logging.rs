//! Logging initialisation
//!
//! The crates log through `tracing` macros. Binaries (and tests that want
//! output) call [`init`] once to install a fmt subscriber.
//!
//! # Environment Variables
//!
//! - `REGIT_LOG=<filter>` - `EnvFilter` directives, e.g. `regit_async=debug`
//! - `RUST_LOG` - used when `REGIT_LOG` is unset
//!
//! Without either, the filter is `info`.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "REGIT_LOG";

const DEFAULT_FILTER: &str = "info";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber
///
/// Idempotent. If another subscriber is already installed (e.g. by the
/// host application) this is a no-op.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_thread_names(true)
        .with_target(true)
        .try_init()
        .is_ok();
    tracing::debug!(installed, "logging initialised");
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
