//! Opt-in file logging for bb.
//!
//! The terminal belongs to the UI, so logs only ever go to a file. Logging
//! is off unless `BB_LOG` holds an `EnvFilter` directive such as `debug` or
//! `bbrowse=trace`; the file is `bb.log` in the user's cache directory.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;

pub const LOG_ENV: &str = "BB_LOG";
const LOG_FILE: &str = "bb.log";

/// Directory holding the log file.
pub fn log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("bbrowse")
}

/// Installs the file subscriber when `BB_LOG` is set. Keep the returned
/// guard alive until exit so buffered lines are flushed.
pub fn init() -> Option<WorkerGuard> {
    let directive = std::env::var(LOG_ENV).ok().filter(|v| !v.is_empty())?;
    let filter = match EnvFilter::try_new(&directive) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("[Warning] invalid {}={:?}: {}", LOG_ENV, directive, e);
            return None;
        }
    };

    let dir = log_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("[Warning] cannot create log directory {}: {}", dir.display(), e);
        return None;
    }
    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    match installed {
        Ok(()) => Some(guard),
        Err(e) => {
            eprintln!("[Warning] logging disabled: {}", e);
            None
        }
    }
}
