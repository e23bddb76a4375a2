//! `tracing` subscriber setup.
//!
//! `RUST_LOG` wins over the configured level when it is set. Both
//! initializers are no-ops after the first successful call.

use tracing_subscriber::EnvFilter;

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a compact, human-readable subscriber writing to stderr.
///
/// # Arguments
///
/// * `level` - Minimum level or filter directive, e.g. `"info"` or `"slotfeed_client=debug"`.
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}

/// Install a JSON-lines subscriber writing to stderr.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .json();

    let _ = subscriber.try_init();
}
