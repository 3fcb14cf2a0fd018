use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the default level,
/// which is `info`, or `warn` with `--quiet`. Output goes to stderr so
/// stdout stays clean for rendered trees.
pub fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
