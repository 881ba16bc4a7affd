// Dead Letter Message Model
// "One record for every message that failed to fly"

use serde::{Deserialize, Serialize};

use crate::time::{current_timestamp_secs, SECS_PER_DAY};

/// Base64 codec for the opaque payload bytes.
///
/// Records are stored as JSON, so the payload must survive the text
/// boundary byte-exact, including empty and non-UTF8 bodies.
mod payload_encoding {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::engine::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// One failed delivery attempt sequence.
///
/// The id is assigned by the caller and doubles as the idempotency key;
/// the manager is the sole writer of the retry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlqMessage {
    /// Caller-assigned, globally unique identifier
    pub id: String,
    /// Logical topic the message belonged to
    pub channel: String,
    /// Original message body, never interpreted by the DLQ
    #[serde(with = "payload_encoding")]
    pub payload: Vec<u8>,
    /// Error message from the most recent failure
    pub error_message: String,
    /// Classification of the most recent failure
    pub error_type: String,
    /// Epoch seconds when the message was first published
    pub original_timestamp: i64,
    /// Epoch seconds of the most recent failure
    pub failure_timestamp: i64,
    /// Failed retry attempts so far
    pub retry_count: u32,
    /// Retry ceiling, fixed at creation time
    pub max_retries: u32,
    /// Subscriber whose processing failed
    pub subscriber_id: String,
}

impl DlqMessage {
    /// Create a new dead letter message for a fresh delivery failure
    #[allow(clippy::too_many_arguments)]
    pub fn new<S: Into<String>>(
        id: S,
        channel: S,
        payload: Vec<u8>,
        error_message: S,
        error_type: S,
        subscriber_id: S,
        max_retries: u32,
        original_timestamp: Option<i64>,
    ) -> Self {
        let now = current_timestamp_secs();

        Self {
            id: id.into(),
            channel: channel.into(),
            payload,
            error_message: error_message.into(),
            error_type: error_type.into(),
            original_timestamp: original_timestamp.unwrap_or(now),
            failure_timestamp: now,
            retry_count: 0,
            max_retries,
            subscriber_id: subscriber_id.into(),
        }
    }

    /// Check whether the message may still be retried
    pub fn is_retryable(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Check whether the message has exhausted its retry budget
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Check whether the message has outlived the retention window
    pub fn should_discard(&self, retention_days: u32) -> bool {
        let age_secs = current_timestamp_secs() - self.failure_timestamp;
        age_secs > i64::from(retention_days) * SECS_PER_DAY
    }

    /// Record another failed retry attempt
    pub fn record_failure<S: Into<String>>(&mut self, error_message: S, error_type: S) {
        self.retry_count += 1;
        self.error_message = error_message.into();
        self.error_type = error_type.into();
        self.failure_timestamp = current_timestamp_secs();
    }

    /// Age of the message since its last failure, in seconds
    pub fn age_secs(&self) -> i64 {
        current_timestamp_secs() - self.failure_timestamp
    }
}
