//! Logging setup
//!
//! Logs go to stderr so reports on stdout stay machine-readable.

use tracing_subscriber::{
    fmt::{format, time::ChronoLocal},
    EnvFilter,
};

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence; `default_level` (e.g. `info`, `debug`)
/// applies when it is unset or unparsable.
pub fn init_log(default_level: &str) {
    let format = format::format()
        .with_level(true)
        .with_target(false)
        .with_timer(ChronoLocal::new("[%m-%d %H:%M:%S%.3f]".to_string()))
        .compact();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding applications)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .event_format(format)
        .with_writer(std::io::stderr)
        .try_init();
}
