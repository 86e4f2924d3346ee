use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use transfer_protocol::{decode_event, ConsumerRecord, TransactionDocument};

use crate::core::error::IngestError;
use crate::core::handler::{Acknowledgment, MessageHandler};
use crate::core::history_cache::{CacheUpdate, HistoryCache};
use crate::types::{SharedKeyValueStore, SharedTransactionStore};

/// Result of a record that made it all the way to acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub document: TransactionDocument,
    pub cache: CacheUpdate,
}

/// Handler for the `transactions` topic.
///
/// Decode, persist, cache update and acknowledgment run under one lock shared
/// by every worker of the topic. The cache update is a read-modify-write on a
/// shared value, and the document store is not assumed to take concurrent
/// writes, so the lock is global rather than per account.
pub struct TransactionHandler {
    store: SharedTransactionStore,
    cache: HistoryCache,
    gate: Mutex<()>,
}

impl TransactionHandler {
    pub fn new(store: SharedTransactionStore, cache_store: SharedKeyValueStore) -> Self {
        Self {
            store,
            cache: HistoryCache::new(cache_store),
            gate: Mutex::new(()),
        }
    }

    /// `Received -> Decoded -> Persisted -> CacheUpdated -> Acknowledged`.
    /// Any error stops the chain and leaves the record unacknowledged.
    /// Callers must hold `gate`.
    async fn process(&self, record: &ConsumerRecord, ack: &dyn Acknowledgment) -> Result<Processed, IngestError> {
        let event = decode_event(&record.value)?;

        let document = event.to_document();
        self.store
            .save(&document)
            .await
            .map_err(IngestError::Persistence)?;

        let cache = self.cache.record(&event).await?;

        ack.acknowledge().await.map_err(IngestError::Acknowledge)?;
        Ok(Processed { document, cache })
    }

    /// Runs one record through the critical section and reports how it ended.
    pub async fn ingest(&self, record: &ConsumerRecord, ack: &dyn Acknowledgment) -> Result<Processed, IngestError> {
        let _guard = self.gate.lock().await;
        self.process(record, ack).await
    }
}

#[async_trait]
impl MessageHandler for TransactionHandler {
    async fn handle(&self, record: &ConsumerRecord, ack: &dyn Acknowledgment) -> anyhow::Result<()> {
        debug!(
            partition = record.partition,
            offset = record.offset,
            payload = %record.value_lossy(),
            "received transaction record"
        );

        match self.ingest(record, ack).await {
            Ok(processed) => info!(
                partition = record.partition,
                offset = record.offset,
                from = %processed.document.from_ulid,
                cache = ?processed.cache,
                "transaction processed and acknowledged"
            ),
            // Left unacknowledged on purpose: the broker hands it out again.
            Err(IngestError::Decode(e)) => warn!(
                partition = record.partition,
                offset = record.offset,
                error = %e,
                "failed to deserialize record as a transaction"
            ),
            Err(e) => error!(
                partition = record.partition,
                offset = record.offset,
                error = %e,
                "error processing transaction record"
            ),
        }
        Ok(())
    }

    async fn handle_dlq(&self, record: &ConsumerRecord, _ack: &dyn Acknowledgment) {
        error!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            payload = %record.value_lossy(),
            "received DLQ transaction record"
        );
    }
}
