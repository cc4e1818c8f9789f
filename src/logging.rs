//! Logger setup for the `wasmload` binary.

use env_logger::Env;

/// Installs `env_logger`. `RUST_LOG` wins over the default filter, which is
/// `warn`, or `debug` with `verbose`.
pub fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
    log::debug!("logging initialised at {}", default);
}
