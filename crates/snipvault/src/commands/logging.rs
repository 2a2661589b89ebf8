//! Logging initialization.

use snipvault_core::config::Config;
use snipvault_util::log::{self, LogConfig, LogLevel};

/// Initialize logging to stderr.
///
/// `--verbose` wins over the configured level; `RUST_LOG` wins over both.
/// Request tracing is only enabled for the server.
pub fn init_logging(verbose: bool, serving: bool, config: &Config) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        config.log_level.map(LogLevel::from).unwrap_or_default()
    };

    log::init(LogConfig {
        level,
        http_requests: serving,
        ..Default::default()
    });
}
