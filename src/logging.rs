//! Tracing setup: console plus a daily-rotated log file.

use tablewatch_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Install the global subscriber. `RUST_LOG` wins over `level_override`,
/// which wins over the configured level.
pub(crate) fn init_tracing(
    config: &LoggingConfig,
    level_override: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .max_log_files(config.max_files)
        .build(&config.dir)?;

    // The guard flushes the file writer on drop, so it lives for the process.
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = GUARD.set(guard);

    let level = level_override.unwrap_or(&config.level);
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // Console on stderr; stdout carries the progress line.
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    Ok(())
}
