//! Logging setup
//!
//! Console output (pretty or JSON) plus an optional daily rotating file.
//! Rotated files older than 14 days are removed by the appender.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "crab-connect";
const LOG_RETENTION_DAYS: usize = 14;

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// ```no_run
/// // Development (console only)
/// init_logger("debug", false, None)?;
///
/// // Production (console + file)
/// init_logger("info", true, Some("./logs"))?;
/// ```
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file = match log_dir {
        Some(dir) => Some(Mutex::new(file_appender(Path::new(dir))?)),
        None => None,
    };

    if json_format {
        let console_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        let file_layer = file.map(|writer| {
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_thread_ids(true)
                .with_writer(writer)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true);
        let file_layer = file.map(|writer| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(writer)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;
    }

    Ok(())
}

/// Daily rotating appender: `<dir>/crab-connect.YYYY-MM-DD.log`
fn file_appender(dir: &Path) -> anyhow::Result<RollingFileAppender> {
    fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(LOG_RETENTION_DAYS)
        .build(dir)?;
    Ok(appender)
}
