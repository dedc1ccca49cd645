//! File logging setup
//!
//! Logs go to a file under the data directory, never to stdout or stderr:
//! those streams carry the report and are redirected while modules load.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::log_path;

/// Environment variable holding the log filter, e.g. `MODVERS_LOG=debug`
pub const LOG_ENV: &str = "MODVERS_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber
///
/// Returns the appender guard, which must be kept alive for the run, or
/// `None` when the log directory is unusable.
pub fn init() -> Option<WorkerGuard> {
    let path = log_path();
    let dir = path.parent()?;
    let file_name = path.file_name()?;
    std::fs::create_dir_all(dir).ok()?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}
