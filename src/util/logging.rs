// DocScan - util/logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [logging] level = "debug"
//
// Output: stderr always, plus an append-only file when [logging] file is set.
// Never logs document contents.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use super::constants::{APP_NAME, APP_VERSION, DEFAULT_LOG_LEVEL};

/// Build the filter with priority:
/// RUST_LOG env var > CLI --debug flag > config level > default "info".
fn build_filter(debug_flag: bool, config_level: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    }
}

/// Initialise the logging subsystem.
///
/// Returns `false` if a global subscriber was already installed (e.g. a
/// second call from a test); the existing subscriber is left in place.
/// A log file that cannot be opened is reported on stderr and skipped.
pub fn init(debug_flag: bool, config_level: Option<&str>, log_file: Option<&str>) -> bool {
    let filter = build_filter(debug_flag, config_level);

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Warning: cannot open log file '{path}': {e}. Logging to stderr only.");
                None
            }
        }
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            app = APP_NAME,
            version = APP_VERSION,
            file = log_file.unwrap_or(""),
            "Logging initialised"
        );
    }
    installed
}
