use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use transfer_protocol::HistoryRecord;

use crate::core::HistoryCache;
use crate::types::SharedKeyValueStore;

/// Loads `{"history:<ulid>:<accountId>": [HistoryRecord, ...], ...}` into the
/// cache store.
pub async fn seed_history<P: AsRef<Path>>(store: SharedKeyValueStore, path: P) -> Result<usize> {
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path.as_ref()))?;
    let entries: BTreeMap<String, Vec<HistoryRecord>> =
        serde_json::from_str(&raw).with_context(|| "parsing history seed JSON")?;

    let cache = HistoryCache::new(store);
    for (key, records) in &entries {
        cache
            .set(key, records)
            .await
            .with_context(|| format!("seeding {key}"))?;
    }

    info!(entries = entries.len(), "seeded history cache");
    Ok(entries.len())
}
