use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use transfer_protocol::TransactionDocument;

use crate::store::{KeyValueStore, StoreError, TransactionStore};

#[derive(Debug, Default)]
pub struct MemoryTransactionStore {
    documents: Mutex<Vec<TransactionDocument>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn documents(&self) -> Vec<TransactionDocument> {
        self.documents.lock().await.clone()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn save(&self, document: &TransactionDocument) -> Result<(), StoreError> {
        self.documents.lock().await.push(document.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
