use tracing_subscriber::EnvFilter;

/// Sends log output to stderr, filtered by `RUST_LOG` (warnings only by default).
///
/// Only the first call in a process has an effect.
#[cfg_attr(test, mutants::skip)] // Installs process-global state, manually tested.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
