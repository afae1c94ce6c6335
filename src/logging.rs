//! Logging configuration with journald support on Linux.
//!
//! Events go to systemd's journal when it is reachable, otherwise to a
//! daily-rolling file under the local data directory. Nothing is written
//! to the terminal, which belongs to prompts and command output.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "PHOTOSHEET_LOG";

/// Initialize the logging system.
///
/// Log level can be controlled via the `PHOTOSHEET_LOG` environment variable,
/// e.g. `PHOTOSHEET_LOG=debug` or `PHOTOSHEET_LOG=photosheet::export=trace`.
/// The default is `info`.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer.with_syslog_identifier("photosheet".to_string()))
                .try_init()?;

            tracing::info!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "photosheet.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes buffered lines on exit; init runs once per process
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    tracing::info!("Logging initialized with file backend at {:?}", log_dir);
    Ok(())
}

pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photosheet")
        .join("logs")
}
