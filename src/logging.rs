//! Tracing setup for the CLI.

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// HTTP stack crates are noisy at debug and only interesting when they fail.
const QUIET_DEPENDENCIES: &[&str] = &["reqwest", "hyper", "hyper_util", "rustls", "h2"];

/// Filter directive for a verbosity level.
pub fn filter_directive(level: LogLevel) -> String {
    let mut directive = level.as_filter().to_string();
    for krate in QUIET_DEPENDENCIES {
        directive.push_str(&format!(",{krate}=error"));
    }
    directive
}

/// Install the global subscriber. `RUST_LOG` overrides the `DEBUG`/`INFO` toggles.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
