//! Tracing setup shared by the library's tests and embedding applications.

/// Install a global env-filter fmt subscriber unless one is already set.
///
/// Pool and scheduler events log under the `cronpool` target; run with
/// `RUST_LOG=cronpool=debug` to watch dispatch decisions and worker
/// lifecycle. Without `RUST_LOG`, only warnings and errors are emitted.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
