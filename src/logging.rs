// Logging setup (tracing + tracing-subscriber)
//
// RUST_LOG controls the filter, default "info".
// Example: RUST_LOG=dispatch_tracker=debug

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global subscriber for a binary
///
/// Logs go to stderr so CLI output on stdout stays pipeable.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialise logging for the terminal dashboard
///
/// The alternate screen owns the terminal, so only errors are let through.
pub fn init_quiet() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Verbose logging for tests; safe to call more than once
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
