//! stderr + daily rolling file, filtered by `RUST_LOG` or `[logging] level`.

use super::config::{AppConfig, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Keep the returned guard alive until exit, or buffered file lines are lost.
pub fn init(config: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = if config.file {
        let dir = config
            .directory
            .clone()
            .unwrap_or_else(AppConfig::default_log_dir);
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&dir, "moode-oled.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_writer(writer).with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("log directory {} unusable: {}", dir.display(), e);
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}
