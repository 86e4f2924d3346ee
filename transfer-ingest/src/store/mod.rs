//! Persistence seams: the durable document store and the key-value store
//! backing the history cache. Both are opaque to the ingestion core.

mod jsonl;
mod memory;

use std::io;

use async_trait::async_trait;
use thiserror::Error;
use transfer_protocol::TransactionDocument;

pub use jsonl::JsonlTransactionStore;
pub use memory::{MemoryKeyValueStore, MemoryTransactionStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn save(&self, document: &TransactionDocument) -> Result<(), StoreError>;
}

/// Single-round-trip string store. No retries; failures go to the caller.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}
