// Error Handling Module
// "Every lost message deserves an honest account of why it fell"

use thiserror::Error;

/// Error types for the dead letter queue subsystem
#[derive(Error, Debug)]
pub enum RookeryError {
    // Persistent store errors
    #[error("Store read failed: {message}")]
    StoreRead { message: String },

    #[error("Store write failed: {message}")]
    StoreWrite { message: String },

    #[error("Store delete failed: {message}")]
    StoreDelete { message: String },

    // Message errors
    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Message exhausted all retries: {message_id}")]
    MessageExhausted { message_id: String },

    #[error("Retry already in flight: {message_id}")]
    RetryInFlight { message_id: String },

    #[error("Redelivery failed: {message}")]
    RedeliveryFailed { message: String },

    // Data processing errors
    #[error("Record serialization failed: {message}")]
    RecordSerialization { message: String },

    #[error("Corrupt record: {message}")]
    CorruptRecord { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidConfigValue { key: String, value: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RookeryError {
    /// Create a store read error
    pub fn store_read<S: Into<String>>(message: S) -> Self {
        Self::StoreRead {
            message: message.into(),
        }
    }

    /// Create a store write error
    pub fn store_write<S: Into<String>>(message: S) -> Self {
        Self::StoreWrite {
            message: message.into(),
        }
    }

    /// Create a store delete error
    pub fn store_delete<S: Into<String>>(message: S) -> Self {
        Self::StoreDelete {
            message: message.into(),
        }
    }

    /// Create a message not found error
    pub fn message_not_found<S: Into<String>>(message_id: S) -> Self {
        Self::MessageNotFound {
            message_id: message_id.into(),
        }
    }

    /// Create a message exhausted error
    pub fn message_exhausted<S: Into<String>>(message_id: S) -> Self {
        Self::MessageExhausted {
            message_id: message_id.into(),
        }
    }

    /// Create a retry in flight error
    pub fn retry_in_flight<S: Into<String>>(message_id: S) -> Self {
        Self::RetryInFlight {
            message_id: message_id.into(),
        }
    }

    /// Create a redelivery failed error
    pub fn redelivery_failed<S: Into<String>>(message: S) -> Self {
        Self::RedeliveryFailed {
            message: message.into(),
        }
    }

    /// Create a record serialization error
    pub fn record_serialization<S: Into<String>>(message: S) -> Self {
        Self::RecordSerialization {
            message: message.into(),
        }
    }

    /// Create a corrupt record error
    pub fn corrupt_record<S: Into<String>>(message: S) -> Self {
        Self::CorruptRecord {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_config_value<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self::InvalidConfigValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::StoreRead { .. } | Self::StoreWrite { .. } | Self::StoreDelete { .. } => "store",
            Self::MessageNotFound { .. }
            | Self::MessageExhausted { .. }
            | Self::RetryInFlight { .. }
            | Self::RedeliveryFailed { .. } => "dead_letter",
            Self::RecordSerialization { .. } | Self::CorruptRecord { .. } => "data",
            Self::Configuration { .. } | Self::InvalidConfigValue { .. } => "configuration",
            Self::Internal { .. } => "general",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            // Retryable errors
            Self::StoreRead { .. }
            | Self::StoreWrite { .. }
            | Self::StoreDelete { .. }
            | Self::RedeliveryFailed { .. } => true,

            // Non-retryable errors
            Self::MessageNotFound { .. }
            | Self::MessageExhausted { .. }
            | Self::RetryInFlight { .. }
            | Self::RecordSerialization { .. }
            | Self::CorruptRecord { .. }
            | Self::Configuration { .. }
            | Self::InvalidConfigValue { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// Get severity level for logging
    pub fn severity(&self) -> tracing::Level {
        match self {
            // Critical errors
            Self::MessageExhausted { .. } => tracing::Level::ERROR,

            // Warning level errors
            Self::StoreRead { .. }
            | Self::StoreWrite { .. }
            | Self::StoreDelete { .. }
            | Self::RedeliveryFailed { .. }
            | Self::CorruptRecord { .. } => tracing::Level::WARN,

            // Info level errors
            Self::MessageNotFound { .. } | Self::RetryInFlight { .. } => tracing::Level::INFO,

            // Debug level errors
            Self::RecordSerialization { .. }
            | Self::Configuration { .. }
            | Self::InvalidConfigValue { .. }
            | Self::Internal { .. } => tracing::Level::DEBUG,
        }
    }
}

/// Convert std::io::Error to RookeryError
impl From<std::io::Error> for RookeryError {
    fn from(error: std::io::Error) -> Self {
        RookeryError::store_write(error.to_string())
    }
}

/// Convert serde_json::Error to RookeryError
impl From<serde_json::Error> for RookeryError {
    fn from(error: serde_json::Error) -> Self {
        RookeryError::record_serialization(error.to_string())
    }
}

/// Result type alias for convenience
pub type RookeryResult<T> = Result<T, RookeryError>;

/// Macro for creating errors with context
#[macro_export]
macro_rules! rookery_error {
    ($variant:ident $(, $arg:expr)* $(,)?) => {
        $crate::error::RookeryError::$variant($($arg),*)
    };
}

/// Macro for early return with error logging
#[macro_export]
macro_rules! rookery_bail {
    ($error:expr) => {
        {
            let error = $error;
            match error.severity() {
                tracing::Level::ERROR => tracing::error!(error = %error, "Operation failed"),
                tracing::Level::WARN => tracing::warn!(error = %error, "Operation failed"),
                tracing::Level::INFO => tracing::info!(error = %error, "Operation failed"),
                tracing::Level::DEBUG => tracing::debug!(error = %error, "Operation failed"),
                tracing::Level::TRACE => tracing::trace!(error = %error, "Operation failed"),
            }
            return Err(error);
        }
    };
}
