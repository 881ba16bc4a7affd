// Configuration Module - Project Rookery
// "A rookery runs on its ledger"

use std::env;
use std::path::{Path, PathBuf};

use config::{Config as RawConfig, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RookeryError, RookeryResult};
use crate::logging::LoggingConfig;

/// A named, self-validating section of the configuration file
pub trait ConfigSection: Default {
    const KEY: &'static str;

    fn validate(&self) -> RookeryResult<()>;
}

/// Dead letter queue manager options, the `[dlq]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DlqConfig {
    /// Directory holding one persisted record per message
    pub storage_path: PathBuf,
    /// Retry ceiling copied onto every new message
    pub max_retries: u32,
    /// Base delay for subscriber-driven retry scheduling, in seconds.
    /// The eligibility scan itself never applies it; see DlqManager.
    pub retry_delay_base_secs: u64,
    /// Age after which an unretried message is discarded
    pub retention_days: u32,
    /// Whether to run the auto-retry eligibility scan
    pub enable_auto_retry: bool,
    /// Seconds between eligibility scans
    pub auto_retry_interval_secs: u64,
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./dlq"),
            max_retries: 3,
            retry_delay_base_secs: 30,
            retention_days: 7,
            enable_auto_retry: true,
            auto_retry_interval_secs: 300,
        }
    }
}

impl ConfigSection for DlqConfig {
    const KEY: &'static str = "dlq";

    fn validate(&self) -> RookeryResult<()> {
        if self.max_retries == 0 {
            crate::rookery_bail!(crate::rookery_error!(
                invalid_config_value,
                "dlq.max_retries",
                self.max_retries.to_string(),
            ));
        }

        if self.retention_days == 0 {
            crate::rookery_bail!(crate::rookery_error!(
                invalid_config_value,
                "dlq.retention_days",
                self.retention_days.to_string(),
            ));
        }

        if self.retry_delay_base_secs == 0 {
            crate::rookery_bail!(crate::rookery_error!(
                invalid_config_value,
                "dlq.retry_delay_base_secs",
                self.retry_delay_base_secs.to_string(),
            ));
        }

        if self.enable_auto_retry && self.auto_retry_interval_secs == 0 {
            crate::rookery_bail!(crate::rookery_error!(
                invalid_config_value,
                "dlq.auto_retry_interval_secs",
                self.auto_retry_interval_secs.to_string(),
            ));
        }

        Ok(())
    }
}

impl ConfigSection for LoggingConfig {
    const KEY: &'static str = "logging";

    fn validate(&self) -> RookeryResult<()> {
        self.level.parse::<tracing::Level>().map_err(|_| {
            crate::rookery_error!(
                invalid_config_value,
                "logging.level",
                self.level.clone()
            )
        })?;
        Ok(())
    }
}

/// Loads configuration sections from a TOML file layered with
/// ROOKERY_-prefixed environment variables
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    explicit_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        let explicit_file = env::var("ROOKERY_CONFIG_FILE").ok().map(PathBuf::from);
        Self { explicit_file }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.explicit_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("config/default.toml"))
    }

    pub fn load_section<T>(&self) -> RookeryResult<T>
    where
        T: ConfigSection + DeserializeOwned,
    {
        let raw = self.build()?;

        let section = match raw.get::<T>(T::KEY) {
            Ok(section) => section,
            Err(config::ConfigError::NotFound(_)) => T::default(),
            Err(e) => {
                return Err(RookeryError::configuration(format!(
                    "Failed to load '{}' configuration section: {e}",
                    T::KEY
                )))
            }
        };

        section.validate()?;
        Ok(section)
    }

    pub fn load_section_from_path<T>(path: impl AsRef<Path>) -> RookeryResult<T>
    where
        T: ConfigSection + DeserializeOwned,
    {
        ConfigLoader::new()
            .with_file(path.as_ref().to_path_buf())
            .load_section::<T>()
    }

    fn build(&self) -> RookeryResult<RawConfig> {
        let mut builder = config::Config::builder();

        let path = self.config_path();
        if path.exists() {
            let path_str = path.to_string_lossy().into_owned();
            builder = builder.add_source(File::new(&path_str, FileFormat::Toml).required(true));
        } else {
            warn!(
                "Configuration file not found at {} - falling back to defaults and environment variables",
                path.display()
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("ROOKERY")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build().map_err(|e| {
            RookeryError::configuration(format!("Failed to build configuration sources: {e}"))
        })
    }
}
