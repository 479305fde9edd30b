use tracing_subscriber::EnvFilter;

/// Sets up structured logging for the CLI.
///
/// `RUST_LOG` wins when set (e.g. `RUST_LOG=caixa_lib=debug`); otherwise the
/// default level is `info`, or `debug` with `verbose`.
pub fn setup_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) is harmless, ignore it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
