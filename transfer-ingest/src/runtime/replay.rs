use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::info;
use transfer_protocol::decode_event;

use crate::broker::MemoryBroker;

/// Produces every non-blank line of a JSON-lines file to `topic`.
///
/// Lines that decode as transactions are keyed by `<fromUlid>:<fromAccountID>`
/// so one account's events share a partition. Undecodable lines are produced
/// as-is, keyless.
pub async fn replay_file<P: AsRef<Path>>(broker: &MemoryBroker, topic: &str, path: P) -> Result<usize> {
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path.as_ref()))?;

    let mut produced = 0;
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let key = decode_event(line.as_bytes())
            .ok()
            .map(|e| Bytes::from(format!("{}:{}", e.from_ulid, e.from_account_id)));
        broker
            .produce(topic, key, line.to_string())
            .await
            .with_context(|| format!("producing replayed record to {topic}"))?;
        produced += 1;
    }

    info!(topic, produced, path = ?path.as_ref(), "replayed records");
    Ok(produced)
}
