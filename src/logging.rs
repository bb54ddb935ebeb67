use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{Layer, filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level directive, e.g. `info` or `debug`.
    pub level: String,
    /// Log destination. No subscriber is installed without one.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Level parsed from `level`, `INFO` if it does not parse.
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }
}

/// Handle to keep the logging worker thread alive
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Initialize the logging system
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    let Some(path) = &config.file else {
        return Ok(None);
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create log file: {:?}", path))?;
    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file);

    // RUST_LOG takes precedence over the command line level.
    let filter = EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy();

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging initialized at level: {}", config.level);
    Ok(Some(LogGuard {
        _guard: worker_guard,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_falls_back_to_info() {
        let config = LogConfig {
            level: "loud".into(),
            file: None,
        };
        assert_eq!(config.parse_level(), LevelFilter::INFO);
        let config = LogConfig {
            level: "debug".into(),
            file: None,
        };
        assert_eq!(config.parse_level(), LevelFilter::DEBUG);
    }

    #[test]
    fn no_file_installs_nothing() {
        assert!(init(&LogConfig::default()).unwrap().is_none());
    }
}
