//! Logging setup for cubby.
//!
//! The same code runs in two places: as a CLI in a terminal and as a plugin
//! inside a host process on a headless box. Both get a tracing subscriber
//! honoring `RUST_LOG`; the headless case adds a non-blocking file writer so
//! there is something to read after the fact.

use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Log verbosity for the stderr stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Info level
    #[default]
    Normal,
    /// Debug level
    Verbose,
    /// Trace level
    Trace,
}

impl Verbosity {
    /// Map a `-v` flag count to a verbosity level.
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Trace,
        }
    }

    /// The level filter this verbosity corresponds to.
    pub fn as_level_filter(&self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::INFO,
            Verbosity::Verbose => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

/// Where and how much to log.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Verbosity for stderr output
    pub verbosity: Verbosity,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

/// Keeps the non-blocking file writer alive.
///
/// Dropping the guard flushes pending log lines, so hold it until the
/// process (or the plugin) is done logging.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber.
///
/// Returns a guard that must be kept alive for the duration of logging.
/// `RUST_LOG` overrides the configured verbosity when set.
pub fn init_logging(config: &LogConfig) -> LogGuard {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.verbosity.as_level_filter().into())
        .from_env_lossy();

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_writer(io::stderr)
        .with_filter(config.verbosity.as_level_filter());

    let (file_layer, file_guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::uptime())
                .with_writer(writer)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    LogGuard {
        _file_guard: file_guard,
    }
}

/// Build a non-blocking appender for the given log file path.
fn file_writer(path: &Path) -> (NonBlocking, WorkerGuard) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("cubby.log");

    tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
}
