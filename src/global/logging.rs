use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::global::config::{AppSettings, LogRotation};
use crate::global::error::AppError;

/// Keeps the file writer flushing. Hold it for the life of the process.
#[must_use]
pub struct LogGuard {
    file: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn writes_to_file(&self) -> bool {
        self.file.is_some()
    }
}

/// Default filter when `RUST_LOG` is not set.
pub fn filter_directive(log_level: &str) -> String {
    format!("meerkat={},info", log_level)
}

pub fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Install the global subscriber: env filter, optional console output and an
/// optional rolling log file.
pub fn init_logging(settings: &AppSettings) -> Result<LogGuard, AppError> {
    let logging = &settings.logging;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&settings.log_level)));

    let console = logging.log_to_console.then(fmt::layer);

    let (file, guard) = if logging.log_to_file {
        let appender = RollingFileAppender::builder()
            .rotation(rotation(logging.log_rotation))
            .filename_prefix(&logging.log_file_prefix)
            .filename_suffix("log")
            .build(&logging.log_directory)
            .map_err(|e| AppError::Logging(format!("cannot open log directory {}: {}", logging.log_directory, e)))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    Ok(LogGuard { file: guard })
}
