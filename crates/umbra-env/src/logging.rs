//! One-time `tracing` setup for test processes.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Installs a `tracing` fmt subscriber that writes through the test
/// harness's captured output.
///
/// `RUST_LOG` wins over `default_filter`; an unparsable `default_filter`
/// falls back to `info`. Only the first call in a process does anything.
/// Returns whether this process's subscriber is the one installed here
/// (false if another global subscriber was already set).
pub fn init_test_logging(default_filter: &str) -> bool {
    *INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .is_ok()
    })
}

/// True once [`init_test_logging`] has run in this process.
pub fn is_initialized() -> bool {
    INSTALLED.get().is_some()
}
