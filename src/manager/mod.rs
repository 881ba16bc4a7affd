// Dead Letter Queue Manager
// "Failed messages roost in the rookery until they fly again or age out"

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DlqConfig;
use crate::error::RookeryResult;
use crate::logging::log_error_with_context;
use crate::message::DlqMessage;
use crate::store::{FileMessageStore, MessageStore};

/// Cleanup passes run on a fixed cadence, independent of retry activity
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Attempts redelivery of a dead letter message to its subscriber.
///
/// Supplied by the integrating side at retry time; the manager never
/// knows how to deliver anything on its own.
#[async_trait]
pub trait RedeliveryHandler: Send + Sync {
    async fn redeliver(&self, channel: &str, payload: &[u8]) -> RookeryResult<()>;
}

/// Outcome of a `replay_all` sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Running counters, kept apart from the message table so stats
/// updates never contend with redelivery I/O
#[derive(Debug, Clone, Default)]
struct DlqCounters {
    total_failures: u64,
    total_retries: u64,
    total_successes: u64,
    total_discarded: u64,
    failures_by_channel: HashMap<String, u64>,
    failures_by_subscriber: HashMap<String, u64>,
}

/// Aggregate view returned by `get_stats`
#[derive(Debug, Clone, Serialize)]
pub struct DlqStats {
    pub total_messages: usize,
    pub retryable_messages: usize,
    pub total_failures: u64,
    pub total_retries: u64,
    pub total_successes: u64,
    pub total_discarded: u64,
    pub failures_by_channel: HashMap<String, u64>,
    pub failures_by_subscriber: HashMap<String, u64>,
}

/// Single authoritative table of failed messages.
///
/// The manager owns the in-memory table and is the only component that
/// reads or writes the persistent store. Everything else - replay tool,
/// background loops, subscriber wiring - goes through its API.
///
/// Precondition: `start()` must have completed before any other
/// operation is invoked; calling `add_failed_message` earlier is
/// undefined by design.
#[derive(Clone)]
pub struct DlqManager {
    config: DlqConfig,
    store: Arc<dyn MessageStore>,
    messages: Arc<RwLock<HashMap<String, DlqMessage>>>,
    counters: Arc<RwLock<DlqCounters>>,
    /// Per-message retry exclusion: ids with a redelivery in flight.
    /// Serializes concurrent retries of one id so retry_count
    /// increments are never lost and never exceed max_retries.
    retries_in_flight: Arc<Mutex<HashSet<String>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    started: Arc<AtomicBool>,
}

impl DlqManager {
    /// Create a manager over an arbitrary message store
    pub fn new(config: DlqConfig, store: Arc<dyn MessageStore>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            store,
            messages: Arc::new(RwLock::new(HashMap::new())),
            counters: Arc::new(RwLock::new(DlqCounters::default())),
            retries_in_flight: Arc::new(Mutex::new(HashSet::new())),
            shutdown_tx: Arc::new(shutdown_tx),
            tasks: Arc::new(Mutex::new(Vec::new())),
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a manager backed by the directory-of-files store at
    /// `config.storage_path`
    pub async fn with_file_store(config: DlqConfig) -> RookeryResult<Self> {
        let store = FileMessageStore::open(config.storage_path.clone()).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn config(&self) -> &DlqConfig {
        &self.config
    }

    /// Load persisted records into memory and launch the background loops
    pub async fn start(&self) -> RookeryResult<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("⚬ Dead letter queue manager already started");
            return Ok(());
        }

        let loaded = self.store.load_all().await?;
        {
            let mut messages = self.messages.write().await;
            for message in loaded {
                messages.insert(message.id.clone(), message);
            }
            info!(
                "📮 Dead letter queue manager started with {} messages",
                messages.len()
            );
        }

        let mut tasks = self.tasks.lock().await;

        if self.config.enable_auto_retry {
            let manager = self.clone();
            let shutdown_rx = self.shutdown_tx.subscribe();
            tasks.push(tokio::spawn(async move {
                manager.auto_retry_loop(shutdown_rx).await;
            }));
        }

        let manager = self.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            manager.cleanup_loop(shutdown_rx).await;
        }));

        Ok(())
    }

    /// Cancel the background loops, wait for them, then flush every
    /// in-memory message to the store. No message is lost on a clean
    /// shutdown.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);

        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain(..).collect()
        };
        for task in tasks {
            if let Err(e) = task.await {
                warn!("⚬ Background task ended abnormally: {}", e);
            }
        }

        let snapshot: Vec<DlqMessage> = {
            let messages = self.messages.read().await;
            messages.values().cloned().collect()
        };
        for message in &snapshot {
            if let Err(e) = self.store.save(message).await {
                log_error_with_context(&e, "Failed to flush message during shutdown");
            }
        }

        info!(
            "📮 Dead letter queue manager stopped, {} messages flushed",
            snapshot.len()
        );
    }

    /// Record a delivery failure reported by the broker.
    ///
    /// Re-adding an existing id is an explicit last-write-wins reset:
    /// the prior record is overwritten and retry_count starts over.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_failed_message(
        &self,
        id: impl Into<String>,
        channel: impl Into<String>,
        payload: Vec<u8>,
        error_message: impl Into<String>,
        error_type: impl Into<String>,
        subscriber_id: impl Into<String>,
        original_timestamp: Option<i64>,
    ) {
        let message = DlqMessage::new(
            id.into(),
            channel.into(),
            payload,
            error_message.into(),
            error_type.into(),
            subscriber_id.into(),
            self.config.max_retries,
            original_timestamp,
        );

        warn!(
            "📮 Added message to dead letter queue: {} (channel: {}, subscriber: {}, error: {})",
            message.id, message.channel, message.subscriber_id, message.error_type
        );

        {
            let mut messages = self.messages.write().await;
            messages.insert(message.id.clone(), message.clone());
        }

        // Persist before returning; a write failure leaves memory
        // authoritative and durability compromised for this message
        if let Err(e) = self.store.save(&message).await {
            log_error_with_context(&e, "Failed to persist dead letter message");
        }

        let mut counters = self.counters.write().await;
        counters.total_failures += 1;
        *counters
            .failures_by_channel
            .entry(message.channel.clone())
            .or_insert(0) += 1;
        *counters
            .failures_by_subscriber
            .entry(message.subscriber_id.clone())
            .or_insert(0) += 1;
    }

    /// Attempt redelivery of one message through the supplied handler.
    ///
    /// Returns true only when the handler succeeded and the message was
    /// removed from the queue; every failure path returns false and is
    /// logged rather than propagated.
    pub async fn retry_message(&self, id: &str, handler: &dyn RedeliveryHandler) -> bool {
        {
            let mut in_flight = self.retries_in_flight.lock().await;
            if !in_flight.insert(id.to_string()) {
                warn!("⟲ Retry already in flight for message: {}", id);
                return false;
            }
        }

        let result = self.retry_message_guarded(id, handler).await;

        self.retries_in_flight.lock().await.remove(id);
        result
    }

    async fn retry_message_guarded(&self, id: &str, handler: &dyn RedeliveryHandler) -> bool {
        // Snapshot what the handler needs, then release the table lock;
        // the redelivery future is never awaited under it
        let (channel, payload) = {
            let messages = self.messages.read().await;
            match messages.get(id) {
                None => {
                    error!("⚬ Cannot retry unknown message: {}", id);
                    return false;
                }
                Some(message) if !message.is_retryable() => {
                    warn!(
                        "⚬ Message {} has exhausted its {} retries, not retrying",
                        id, message.max_retries
                    );
                    return false;
                }
                Some(message) => (message.channel.clone(), message.payload.clone()),
            }
        };

        match handler.redeliver(&channel, &payload).await {
            Ok(()) => {
                {
                    let mut messages = self.messages.write().await;
                    messages.remove(id);
                }
                if let Err(e) = self.store.delete(id).await {
                    log_error_with_context(&e, "Failed to delete redelivered message");
                }

                self.counters.write().await.total_successes += 1;
                info!("✓ Successfully redelivered message: {} (channel: {})", id, channel);
                true
            }
            Err(e) => {
                let updated = {
                    let mut messages = self.messages.write().await;
                    match messages.get_mut(id) {
                        Some(message) => {
                            message.record_failure(e.to_string(), e.category().to_string());
                            Some(message.clone())
                        }
                        // The cleanup loop may have discarded it while
                        // the handler was running
                        None => None,
                    }
                };

                let Some(message) = updated else {
                    warn!("⚬ Message {} disappeared during retry", id);
                    return false;
                };

                if let Err(save_err) = self.store.save(&message).await {
                    log_error_with_context(&save_err, "Failed to persist retried message");
                }

                self.counters.write().await.total_retries += 1;

                if message.is_exhausted() {
                    error!(
                        "📮 Message permanently failed after {} retries: {} (channel: {}, subscriber: {}) - retained until retention expiry",
                        message.retry_count, id, message.channel, message.subscriber_id
                    );
                } else {
                    debug!(
                        "⟲ Retry failed for message: {} (attempt {}/{})",
                        id, message.retry_count, message.max_retries
                    );
                }

                false
            }
        }
    }

    /// Replay every message currently in the queue.
    ///
    /// Operates on a snapshot of ids, so the table may change freely
    /// while the sweep runs.
    pub async fn replay_all(&self, handler: &dyn RedeliveryHandler) -> ReplayReport {
        let ids: Vec<String> = {
            let messages = self.messages.read().await;
            messages.keys().cloned().collect()
        };

        let mut report = ReplayReport {
            total: ids.len(),
            succeeded: 0,
            failed: 0,
        };

        for id in &ids {
            if self.retry_message(id, handler).await {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            "⟲ Replay sweep complete: {} total, {} succeeded, {} failed",
            report.total, report.succeeded, report.failed
        );
        report
    }

    /// Look up one message by id
    pub async fn get_message(&self, id: &str) -> Option<DlqMessage> {
        self.messages.read().await.get(id).cloned()
    }

    /// Snapshot of every message in the queue
    pub async fn get_all_messages(&self) -> Vec<DlqMessage> {
        self.messages.read().await.values().cloned().collect()
    }

    /// Snapshot of the messages belonging to one channel
    pub async fn get_messages_by_channel(&self, channel: &str) -> Vec<DlqMessage> {
        self.messages
            .read()
            .await
            .values()
            .filter(|m| m.channel == channel)
            .cloned()
            .collect()
    }

    /// Messages that still have retry budget left
    pub async fn get_retryable_messages(&self) -> Vec<DlqMessage> {
        self.messages
            .read()
            .await
            .values()
            .filter(|m| m.is_retryable())
            .cloned()
            .collect()
    }

    /// Messages that burned through max_retries and await retention cleanup
    pub async fn get_exhausted_messages(&self) -> Vec<DlqMessage> {
        self.messages
            .read()
            .await
            .values()
            .filter(|m| m.is_exhausted())
            .cloned()
            .collect()
    }

    /// Aggregate statistics
    pub async fn get_stats(&self) -> DlqStats {
        let (total_messages, retryable_messages) = {
            let messages = self.messages.read().await;
            (
                messages.len(),
                messages.values().filter(|m| m.is_retryable()).count(),
            )
        };

        let counters = self.counters.read().await;
        DlqStats {
            total_messages,
            retryable_messages,
            total_failures: counters.total_failures,
            total_retries: counters.total_retries,
            total_successes: counters.total_successes,
            total_discarded: counters.total_discarded,
            failures_by_channel: counters.failures_by_channel.clone(),
            failures_by_subscriber: counters.failures_by_subscriber.clone(),
        }
    }

    /// One pass of the retention scan; returns how many messages were
    /// discarded. The cleanup loop calls this hourly, and operators may
    /// trigger it directly.
    pub async fn run_cleanup_pass(&self) -> usize {
        let expired: Vec<DlqMessage> = {
            let mut messages = self.messages.write().await;
            let expired_ids: Vec<String> = messages
                .values()
                .filter(|m| m.should_discard(self.config.retention_days))
                .map(|m| m.id.clone())
                .collect();
            expired_ids
                .iter()
                .filter_map(|id| messages.remove(id))
                .collect()
        };

        for message in &expired {
            warn!(
                "📮 Discarding expired message: {} (channel: {}, age: {}s)",
                message.id,
                message.channel,
                message.age_secs()
            );
            if let Err(e) = self.store.delete(&message.id).await {
                log_error_with_context(&e, "Failed to delete expired message");
            }
        }

        if !expired.is_empty() {
            self.counters.write().await.total_discarded += expired.len() as u64;
            info!("📮 Cleaned up {} expired dead letter messages", expired.len());
        }

        expired.len()
    }

    /// Eligibility scan: counts retryable messages and reports them.
    ///
    /// Scanning alone never redelivers anything; a subscriber-supplied
    /// handler is required for that, and this loop does not have one.
    async fn auto_retry_loop(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.auto_retry_interval_secs));
        info!(
            "⟲ Auto-retry eligibility scan started (every {}s)",
            self.config.auto_retry_interval_secs
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let eligible = {
                        let messages = self.messages.read().await;
                        messages.values().filter(|m| m.is_retryable()).count()
                    };

                    if eligible > 0 {
                        info!("⟲ {} dead letter messages eligible for retry", eligible);
                    } else {
                        debug!("⟲ No dead letter messages eligible for retry");
                    }

                    // TODO: wire a subscriber-driven retry executor here so
                    // eligible messages are actually redelivered, spacing
                    // attempts by retry_delay_base_secs; until then the scan
                    // only reports eligibility.
                }
                _ = shutdown_rx.changed() => break,
            }
        }

        debug!("⟲ Auto-retry eligibility scan stopped");
    }

    /// Hourly retention scan
    async fn cleanup_loop(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        info!(
            "📮 Retention cleanup loop started (retention: {} days)",
            self.config.retention_days
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_cleanup_pass().await;
                }
                _ = shutdown_rx.changed() => break,
            }
        }

        debug!("📮 Retention cleanup loop stopped");
    }
}
