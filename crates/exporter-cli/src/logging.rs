//! Logging initialization.
//!
//! Everything at the configured level goes to `<log_dir>/<timestamp>/main.log`;
//! only warnings and errors reach stderr so progress bars stay readable.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Name of the log file inside the run directory.
const LOG_FILE: &str = "main.log";

/// Directory of one run's logs, `<log_dir>/<ddmmYYYY_HHMMSS>`.
pub fn run_log_dir(log_dir: &Path, now: chrono::DateTime<chrono::Local>) -> PathBuf {
    log_dir.join(now.format("%d%m%Y_%H%M%S").to_string())
}

fn default_filter(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("exporter={level},exporter_core={level}")
}

/// Initialize the logging system and return the path of the log file.
pub fn init_logging(log_dir: &Path, debug: bool) -> Result<PathBuf> {
    let dir = run_log_dir(log_dir, chrono::Local::now());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;
    let path = dir.join(LOG_FILE);
    let file = File::create(&path)
        .with_context(|| format!("Cannot create log file '{}'", path.display()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug).into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .init();

    let debug_enabled = debug;
    tracing::info!(path = %path.display(), debug = debug_enabled, "Logging initialized");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_log_dir_is_timestamped() {
        let now = chrono::Local
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 2)
            .single()
            .unwrap();
        assert_eq!(
            run_log_dir(Path::new("logs"), now),
            PathBuf::from("logs/07032024_090502")
        );
    }

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(false), "exporter=info,exporter_core=info");
        assert_eq!(default_filter(true), "exporter=debug,exporter_core=debug");
    }
}
