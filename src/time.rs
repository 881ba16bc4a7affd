// Time Helpers
// "The clock the rookery keeps"

/// Current wall-clock time as epoch seconds.
///
/// Persisted records store timestamps in this resolution, so every
/// comparison in the retry and retention paths goes through here.
pub fn current_timestamp_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Seconds in one day, for retention arithmetic.
pub const SECS_PER_DAY: i64 = 24 * 60 * 60;
