// Integration Tests - Project Rookery
// "Walk the whole rookery before trusting it with the realm's messages"

use rookery::config::{ConfigLoader, DlqConfig};
use rookery::error::{RookeryError, RookeryResult};
use rookery::manager::{DlqManager, RedeliveryHandler, ReplayReport};
use rookery::store::{FileMessageStore, MessageStore};
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Succeeds after a configurable number of rejections, recording every
/// delivery it accepted
struct FlakySubscriber {
    failures_remaining: AtomicU32,
    deliveries: AtomicU32,
}

impl FlakySubscriber {
    fn new(failures: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(failures),
            deliveries: AtomicU32::new(0),
        }
    }
}

#[async_trait::async_trait]
impl RedeliveryHandler for FlakySubscriber {
    async fn redeliver(&self, _channel: &str, _payload: &[u8]) -> RookeryResult<()> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(RookeryError::redelivery_failed("subscriber unavailable"));
        }
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn manager_config(storage: &TempDir) -> DlqConfig {
    DlqConfig {
        storage_path: storage.path().to_path_buf(),
        max_retries: 3,
        enable_auto_retry: false,
        ..DlqConfig::default()
    }
}

#[tokio::test]
async fn test_full_lifecycle_across_restart() {
    let storage = TempDir::new().unwrap();

    // First process lifetime: accumulate failures, retry some
    {
        let manager = DlqManager::with_file_store(manager_config(&storage))
            .await
            .unwrap();
        manager.start().await.unwrap();

        manager
            .add_failed_message(
                "quote-evt-1",
                "quotes",
                b"\x00\x01binary quote frame\xff".to_vec(),
                "write timeout",
                "timeout",
                "influx-writer",
                Some(1_750_000_000),
            )
            .await;
        manager
            .add_failed_message(
                "quote-evt-2",
                "quotes",
                b"second frame".to_vec(),
                "write timeout",
                "timeout",
                "influx-writer",
                None,
            )
            .await;
        manager
            .add_failed_message(
                "kline-evt-1",
                "klines",
                b"kline frame".to_vec(),
                "connection refused",
                "connection",
                "indicator-calc",
                None,
            )
            .await;

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.total_failures, 3);
        assert_eq!(stats.failures_by_channel.get("quotes"), Some(&2));
        assert_eq!(stats.failures_by_subscriber.get("influx-writer"), Some(&2));

        // One failed manual retry before shutdown
        let subscriber = FlakySubscriber::new(u32::MAX);
        assert!(!manager.retry_message("kline-evt-1", &subscriber).await);

        manager.stop().await;
    }

    // Second process lifetime: everything is still there, then drains
    {
        let manager = DlqManager::with_file_store(manager_config(&storage))
            .await
            .unwrap();
        manager.start().await.unwrap();

        assert_eq!(manager.get_all_messages().await.len(), 3);

        let recovered = manager.get_message("quote-evt-1").await.unwrap();
        assert_eq!(recovered.payload, b"\x00\x01binary quote frame\xff".to_vec());
        assert_eq!(recovered.original_timestamp, 1_750_000_000);

        let retried = manager.get_message("kline-evt-1").await.unwrap();
        assert_eq!(retried.retry_count, 1);

        // Subscriber is healthy again: the sweep drains the queue
        let subscriber = FlakySubscriber::new(0);
        let report = manager.replay_all(&subscriber).await;
        assert_eq!(
            report,
            ReplayReport {
                total: 3,
                succeeded: 3,
                failed: 0
            }
        );
        assert_eq!(subscriber.deliveries.load(Ordering::SeqCst), 3);
        assert!(manager.get_all_messages().await.is_empty());

        manager.stop().await;
    }

    // Nothing is left on disk after a fully drained queue
    let store = FileMessageStore::open(storage.path()).await.unwrap();
    assert!(store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exhaustion_flow_keeps_message_for_operators() {
    let storage = TempDir::new().unwrap();
    let manager = DlqManager::with_file_store(manager_config(&storage))
        .await
        .unwrap();
    manager.start().await.unwrap();

    manager
        .add_failed_message(
            "stuck-1",
            "quotes",
            b"frame".to_vec(),
            "schema mismatch",
            "validation",
            "influx-writer",
            None,
        )
        .await;

    let subscriber = FlakySubscriber::new(u32::MAX);
    for _ in 0..5 {
        assert!(!manager.retry_message("stuck-1", &subscriber).await);
    }

    // Only max_retries attempts actually reached the subscriber
    let message = manager.get_message("stuck-1").await.unwrap();
    assert_eq!(message.retry_count, 3);
    assert!(!message.is_retryable());

    let exhausted = manager.get_exhausted_messages().await;
    assert_eq!(exhausted.len(), 1);
    assert_eq!(exhausted[0].id, "stuck-1");

    // Exhausted does not mean deleted
    assert_eq!(manager.get_stats().await.total_messages, 1);

    manager.stop().await;
}

#[tokio::test]
async fn test_manager_built_from_config_file() {
    let storage = TempDir::new().unwrap();
    let config_dir = TempDir::new().unwrap();

    let config_path = config_dir.path().join("rookery.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(
        file,
        "[dlq]\nstorage_path = {:?}\nmax_retries = 2\nenable_auto_retry = false",
        storage.path()
    )
    .unwrap();

    let config: DlqConfig = ConfigLoader::load_section_from_path(&config_path).unwrap();
    assert_eq!(config.max_retries, 2);

    let manager = DlqManager::with_file_store(config).await.unwrap();
    manager.start().await.unwrap();

    manager
        .add_failed_message(
            "m1",
            "quotes",
            b"frame".to_vec(),
            "boom",
            "connection",
            "sub-1",
            None,
        )
        .await;

    // The ceiling from the file is copied onto the message
    assert_eq!(manager.get_message("m1").await.unwrap().max_retries, 2);

    manager.stop().await;

    // Records landed in the configured directory
    let store = FileMessageStore::open(storage.path()).await.unwrap();
    assert_eq!(store.load_all().await.unwrap().len(), 1);
}
