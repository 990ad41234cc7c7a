use crate::{KeyValueStore, StorageError};
use engagemint_types::MintingDay;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Typed schema for every kind of per-day worker state.
///
/// One variant per state kind; rendering is the only place a key string is
/// ever built, which removes key-collision bugs as a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    /// High-water mark of directory indices already claimed by batches.
    MaxEndIndex,
    /// Per-user tallies accumulated so far.
    Tallies,
    /// Posts held back for authoritative re-verification.
    PendingVerification,
    /// Running-hash accumulator state.
    ArchiveState,
    /// Resolved handle list for the day's registered users.
    HandleDirectory,
    /// The worker's own record of in-flight batches and their cursors.
    ActiveBatches,
    /// Cached handle slice for one batch range.
    BatchHandles { start_index: u32, end_index: u32 },
}

impl StateKey {
    /// Render the storage key for this state under the given day's prefix.
    pub fn render(&self, day: MintingDay) -> String {
        let suffix = match self {
            StateKey::MaxEndIndex => "max-end-index".to_string(),
            StateKey::Tallies => "tallies".to_string(),
            StateKey::PendingVerification => "pending-verification".to_string(),
            StateKey::ArchiveState => "archive-state".to_string(),
            StateKey::HandleDirectory => "handle-directory".to_string(),
            StateKey::ActiveBatches => "active-batches".to_string(),
            StateKey::BatchHandles {
                start_index,
                end_index,
            } => format!("batch-handles-{start_index}-{end_index}"),
        };
        format!("{}/{}", day.timestamp(), suffix)
    }
}

/// Storage facade scoped to one minting day.
///
/// Values are JSON; a value that fails to decode surfaces as
/// [`StorageError::Corrupt`] rather than being silently dropped.
#[derive(Clone)]
pub struct EpochStore {
    store: Arc<dyn KeyValueStore>,
    day: MintingDay,
}

impl EpochStore {
    pub fn new(store: Arc<dyn KeyValueStore>, day: MintingDay) -> Self {
        Self { store, day }
    }

    pub fn day(&self) -> MintingDay {
        self.day
    }

    pub async fn get<T: DeserializeOwned>(&self, key: StateKey) -> Result<Option<T>, StorageError> {
        let rendered = key.render(self.day);
        match self.store.get(&rendered).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StorageError::Corrupt {
                    key: rendered,
                    source,
                }),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: StateKey,
        value: &T,
    ) -> Result<(), StorageError> {
        let rendered = key.render(self.day);
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Corrupt {
            key: rendered.clone(),
            source,
        })?;
        self.store.set(&rendered, &raw).await
    }

    pub async fn delete(&self, key: StateKey) -> Result<(), StorageError> {
        self.store.delete(&key.render(self.day)).await
    }

    /// Every batch range that still has a cached handle list.
    ///
    /// The cache is written when a range is claimed and deleted when the
    /// range is finished or abandoned, so the surviving caches are the
    /// record of claims an aborted invocation may have left behind.
    pub async fn batch_handle_ranges(&self) -> Result<Vec<(u32, u32)>, StorageError> {
        let prefix = format!("{}/batch-handles-", self.day.timestamp());
        let mut ranges = Vec::new();
        for key in self.store.keys().await? {
            if let Some(rest) = key.strip_prefix(&prefix) {
                if let Some((start, end)) = rest.split_once('-') {
                    if let (Ok(start), Ok(end)) = (start.parse(), end.parse()) {
                        ranges.push((start, end));
                    }
                }
            }
        }
        ranges.sort_unstable();
        Ok(ranges)
    }

    /// Delete every key belonging to this day.
    pub async fn clear_day(&self) -> Result<(), StorageError> {
        let prefix = format!("{}/", self.day.timestamp());
        for key in self.store.keys().await? {
            if key.starts_with(&prefix) {
                self.store.delete(&key).await?;
            }
        }
        Ok(())
    }
}
