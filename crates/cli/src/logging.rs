//! Logging setup for the binaries.
//!
//! Logs go to stderr so stdout carries only the command's result.
//! `RUST_LOG` wins when set; otherwise `-v` raises the level from `warn`
//! to `info`, `-vv` to `debug`. `TOOLBELT_LOG_FORMAT=json` selects the JSON
//! formatter.

use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log format (`json` or anything else for text).
pub const LOG_FORMAT_ENV: &str = "TOOLBELT_LOG_FORMAT";

/// Default filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(verbosity: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let _ = if json { builder.json().try_init() } else { builder.with_target(false).try_init() };
}
