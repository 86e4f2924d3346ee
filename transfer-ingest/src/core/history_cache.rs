//! Per-account recent-activity lists kept in the key-value store.
//!
//! An entry is a JSON array of [`HistoryRecord`], most recent first, stored
//! under `history:<ulid>:<accountId>`. Entries are created by whoever owns
//! the account view; this module only rotates entries that already exist and
//! never changes their length.
//!
//! The rotation keeps the list length fixed instead of growing it up to a
//! cap, and a missing entry is left missing. Both are what the service does
//! today; see DESIGN.md before changing either.

use thiserror::Error;
use tracing::debug;
use transfer_protocol::{decode_history, encode_history, DecodeError, HistoryRecord, TransactionEvent};

use crate::store::StoreError;
use crate::types::SharedKeyValueStore;

const HISTORY_CACHE_KEY: &str = "history";

pub fn history_cache_key(ulid: &str, account_id: &str) -> String {
    format!("{HISTORY_CACHE_KEY}:{ulid}:{account_id}")
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("cached value under {key} is not a history list: {source}")]
    Corrupt { key: String, source: DecodeError },

    #[error("could not encode history list: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What a cache update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheUpdate {
    /// No entry for the key; nothing written.
    Missing,
    /// Entry exists but holds no slots; nothing written.
    Empty,
    /// Entry rewritten with the new record in front, same length.
    Rotated { len: usize },
}

/// Newest first, oldest dropped: `[newest, r0, .., r(n-2)]` for an input of
/// length `n`. The result is never longer than `existing`.
pub fn slide(existing: &[HistoryRecord], newest: HistoryRecord) -> Vec<HistoryRecord> {
    std::iter::once(newest)
        .chain(existing.iter().cloned())
        .take(existing.len())
        .collect()
}

#[derive(Clone)]
pub struct HistoryCache {
    store: SharedKeyValueStore,
}

impl HistoryCache {
    pub fn new(store: SharedKeyValueStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<HistoryRecord>>, CacheError> {
        match self.store.get(key).await? {
            Some(raw) => decode_history(&raw)
                .map(Some)
                .map_err(|source| CacheError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, records: &[HistoryRecord]) -> Result<(), CacheError> {
        let raw = encode_history(records)?;
        self.store.set(key, raw).await?;
        Ok(())
    }

    /// Pushes `event` onto the sender's existing entry, if there is one.
    pub async fn record(&self, event: &TransactionEvent) -> Result<CacheUpdate, CacheError> {
        let key = history_cache_key(&event.from_ulid, &event.from_account_id);
        let Some(existing) = self.get(&key).await? else {
            debug!(%key, "no history entry; cache left untouched");
            return Ok(CacheUpdate::Missing);
        };
        if existing.is_empty() {
            debug!(%key, "history entry has no slots; cache left untouched");
            return Ok(CacheUpdate::Empty);
        }

        let updated = slide(&existing, event.to_history_record());
        self.set(&key, &updated).await?;
        Ok(CacheUpdate::Rotated { len: updated.len() })
    }
}
