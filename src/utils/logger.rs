//! Logger bootstrap for applications embedding the store

use env_logger::{Builder, Env};
use log::LevelFilter;

// Chatty dependency targets that drown out store logs
const MUTED_TARGETS: &[&str] = &["tokio", "mio"];

#[cfg(debug_assertions)]
const DEFAULT_FILTER: &str = "debug";

#[cfg(not(debug_assertions))]
const DEFAULT_FILTER: &str = "info";

/// Initialize the global logger
///
/// `RUST_LOG` takes precedence over `default_filter`; when neither is set
/// the level is `debug` for debug builds and `info` otherwise. Calling this
/// more than once is harmless, later calls are ignored.
pub fn init_logging(default_filter: Option<&str>) {
    let env = Env::default().default_filter_or(default_filter.unwrap_or(DEFAULT_FILTER));
    let mut builder = Builder::from_env(env);
    for target in MUTED_TARGETS {
        builder.filter_module(target, LevelFilter::Warn);
    }
    if builder.try_init().is_err() {
        log::debug!("logger already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(Some("trace"));
        init_logging(None);
        log::info!("logger initialized for tests");
    }
}
