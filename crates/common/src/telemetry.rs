//! Tracing subscriber setup shared by the binaries
//!
//! The single-shot query binary keeps stdout for its JSON envelope, so each
//! binary picks where log records go.

use crate::config::ObservabilityConfig;
use tracing_subscriber::EnvFilter;

/// Where log records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    Stderr,
    /// No subscriber is installed; every event is dropped
    Off,
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `observability.log_level`. Returns false when nothing was installed.
pub fn init_tracing(config: &ObservabilityConfig, sink: LogSink) -> bool {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    let builder = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
    };

    let result = match (sink, config.json_logging) {
        (LogSink::Off, _) => return false,
        (LogSink::Stdout, true) => builder().json().with_writer(std::io::stdout).try_init(),
        (LogSink::Stdout, false) => builder().with_writer(std::io::stdout).try_init(),
        (LogSink::Stderr, true) => builder().json().with_writer(std::io::stderr).try_init(),
        (LogSink::Stderr, false) => builder().with_writer(std::io::stderr).try_init(),
    };

    result.is_ok()
}
