//! Tracing subscriber setup for the binary
//!
//! Library code only emits `tracing` events inside per-stage spans; installing
//! a subscriber is left to the entry point.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "phishnet=info";

/// Log file name for a run started now, e.g. `10_17_2026_14_03_59.log`.
pub fn log_file_name() -> String {
    format!("{}.log", chrono::Local::now().format("%m_%d_%Y_%H_%M_%S"))
}

/// Install a stderr subscriber and, when `log_dir` is given, a plain-text file
/// layer writing to `<log_dir>/<timestamp>.log`.
///
/// The returned guard must be held until exit so buffered file output is flushed.
pub fn init_logging(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, log_file_name());
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name_format() {
        let name = log_file_name();
        assert!(name.ends_with(".log"));
        // mm_dd_YYYY_HH_MM_SS
        assert_eq!(name.trim_end_matches(".log").split('_').count(), 6);
    }
}
