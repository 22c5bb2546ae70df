//! Logging configuration.
//!
//! Logs always go to stderr so that `ask` output on stdout stays clean and
//! the server's request log interleaves with pipeline traces.

use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Builds the env filter, honouring `RUST_LOG` and falling back to `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initializes logging to stderr.
///
/// `verbose` lowers the default level to `debug` so stage transitions and
/// classification decisions become visible.
pub fn init_stderr_logging(verbose: bool) {
    let default = if verbose { "debug" } else { DEFAULT_FILTER };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default))
        .with_writer(std::io::stderr)
        .init();
}
