// Persistent Message Store
// "The rookery ledger survives the keeper"

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::error::{RookeryError, RookeryResult};
use crate::message::DlqMessage;

/// Durable storage of dead letter records, keyed by message id.
///
/// The manager is the only caller. Kept behind a trait so the
/// directory-of-files layout can be swapped for an embedded KV store
/// without touching the manager logic.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist one record, replacing any previous record with the same id
    async fn save(&self, message: &DlqMessage) -> RookeryResult<()>;

    /// Load every readable record. Corrupt records are skipped, not fatal.
    async fn load_all(&self) -> RookeryResult<Vec<DlqMessage>>;

    /// Remove the record for the given id, if present
    async fn delete(&self, id: &str) -> RookeryResult<()>;
}

/// One JSON file per message inside a storage directory.
///
/// Writes go through a temp file and rename so a crash mid-write never
/// leaves a half-written record where a good one used to be.
pub struct FileMessageStore {
    root: PathBuf,
}

impl FileMessageStore {
    /// Open the store, creating the storage directory if absent
    pub async fn open(root: impl Into<PathBuf>) -> RookeryResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            RookeryError::store_write(format!(
                "Failed to create storage directory {}: {e}",
                root.display()
            ))
        })?;

        debug!("⚬ Message store opened at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_id(id)))
    }
}

/// Flatten a caller-assigned id to a filesystem-safe name
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl MessageStore for FileMessageStore {
    async fn save(&self, message: &DlqMessage) -> RookeryResult<()> {
        let path = self.record_path(&message.id);
        let tmp_path = path.with_extension("json.tmp");

        let serialized = serde_json::to_string_pretty(message)
            .map_err(|e| RookeryError::record_serialization(e.to_string()))?;

        tokio::fs::write(&tmp_path, serialized).await.map_err(|e| {
            RookeryError::store_write(format!(
                "Failed to write record {}: {e}",
                tmp_path.display()
            ))
        })?;

        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            RookeryError::store_write(format!(
                "Failed to finalize record {}: {e}",
                path.display()
            ))
        })?;

        debug!("⚬ Persisted message {} to {}", message.id, path.display());
        Ok(())
    }

    async fn load_all(&self) -> RookeryResult<Vec<DlqMessage>> {
        let mut messages = Vec::new();
        let mut skipped = 0usize;

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            RookeryError::store_read(format!(
                "Failed to read storage directory {}: {e}",
                self.root.display()
            ))
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            RookeryError::store_read(format!("Failed to enumerate records: {e}"))
        })? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    error!("⚬ Skipping unreadable record {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            };

            match serde_json::from_str::<DlqMessage>(&content) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    error!("⚬ Skipping corrupt record {}: {}", path.display(), e);
                    skipped += 1;
                }
            }
        }

        info!(
            "📮 Loaded {} dead letter records from {} ({} skipped)",
            messages.len(),
            self.root.display(),
            skipped
        );
        Ok(messages)
    }

    async fn delete(&self, id: &str) -> RookeryResult<()> {
        let path = self.record_path(id);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("⚬ Deleted record for message {}", id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RookeryError::store_delete(format!(
                "Failed to delete record {}: {e}",
                path.display()
            ))),
        }
    }
}
