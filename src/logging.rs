// Structured Logging Configuration
// "Every message that falls must be recorded"

use crate::error::{RookeryError, RookeryResult};
use serde::{Deserialize, Serialize};
use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: String,
    /// Whether to include thread IDs
    pub include_thread_ids: bool,
    /// Whether to include target module names
    pub include_targets: bool,
    /// Whether to enable ANSI colors in output
    pub enable_colors: bool,
    /// Environment filter override
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            include_thread_ids: false,
            include_targets: false,
            enable_colors: true,
            env_filter: None,
        }
    }
}

/// Logging format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = RookeryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            _ => {
                crate::rookery_bail!(crate::rookery_error!(
                    configuration,
                    format!("Invalid log format: {s}. Valid options: json, pretty, compact")
                ));
            }
        }
    }
}

/// Initialize logging with the given configuration
pub fn init_logging(config: &LoggingConfig) -> RookeryResult<()> {
    let level = config.level.parse::<Level>().map_err(|_| {
        crate::rookery_error!(
            configuration,
            format!("Invalid log level: {}", config.level)
        )
    })?;

    let format = config.format.parse::<LogFormat>()?;

    let env_filter = if let Some(ref filter) = config.env_filter {
        EnvFilter::try_new(filter).map_err(|e| {
            crate::rookery_error!(configuration, format!("Invalid env filter: {e}"))
        })?
    } else {
        EnvFilter::from_default_env()
            .add_directive(format!("rookery={level}").parse().unwrap())
            .add_directive(format!("rookeryctl={level}").parse().unwrap())
    };

    let subscriber = Registry::default().with(env_filter);

    match format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids);
            subscriber.with(layer.with_writer(io::stdout)).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_ansi(config.enable_colors);
            subscriber.with(layer.with_writer(io::stdout)).init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_target(config.include_targets)
                .with_thread_ids(config.include_thread_ids)
                .with_ansi(config.enable_colors);
            subscriber.with(layer.with_writer(io::stdout)).init();
        }
    }

    tracing::debug!(
        "⚬ Logging initialized with level: {}, format: {}",
        config.level,
        config.format
    );

    Ok(())
}

/// Error logging helper that honors the error's own severity
pub fn log_error_with_context(error: &RookeryError, context: &str) {
    match error.severity() {
        Level::ERROR => tracing::error!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
        Level::WARN => tracing::warn!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
        Level::INFO => tracing::info!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
        _ => tracing::debug!(
            error = %error,
            context = context,
            category = error.category(),
            retryable = error.is_retryable(),
            "Operation failed with error"
        ),
    }
}
