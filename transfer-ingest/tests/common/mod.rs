#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use transfer_ingest::broker::BrokerError;
use transfer_ingest::core::{Acknowledgment, MessageHandler};
use transfer_ingest::store::{KeyValueStore, MemoryKeyValueStore, StoreError, TransactionStore};
use transfer_protocol::{ConsumerRecord, HistoryRecord, TransactionDocument};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_json(from_ulid: &str, account: &str, value: &str) -> String {
    format!(
        r#"{{"fromUlid":"{from_ulid}","fromName":"Alice","fromAccountID":"{account}","toUlid":"U2","toName":"Bob","toAccountID":"A2","value":"{value}","time":"2024-01-01T10:00:00"}}"#
    )
}

pub fn record(offset: u64, payload: impl Into<String>) -> ConsumerRecord {
    ConsumerRecord {
        topic: "transactions".to_string(),
        partition: 0,
        offset,
        key: None,
        value: Bytes::from(payload.into()),
        timestamp: 1_704_103_200_000,
    }
}

pub fn history(from_ulid: &str) -> HistoryRecord {
    serde_json::from_str(&format!(
        r#"{{"fromUlid":"{from_ulid}","fromUser":"Zed","toUlid":"U9","toUser":"Yan","value":"5","time":"2023-12-31T09:00:00"}}"#
    ))
    .expect("valid history record")
}

pub fn log_of(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[derive(Default)]
pub struct RecordingAck {
    count: AtomicUsize,
    label: String,
    log: Option<EventLog>,
}

impl RecordingAck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logging(label: &str, log: EventLog) -> Self {
        Self {
            count: AtomicUsize::new(0),
            label: label.to_string(),
            log: Some(log),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Acknowledgment for RecordingAck {
    async fn acknowledge(&self) -> Result<(), BrokerError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap().push(format!("ack:{}", self.label));
        }
        Ok(())
    }
}

pub struct FailingAck;

#[async_trait]
impl Acknowledgment for FailingAck {
    async fn acknowledge(&self) -> Result<(), BrokerError> {
        Err(BrokerError::Other("commit rejected".to_string()))
    }
}

pub struct FailingStore;

#[async_trait]
impl TransactionStore for FailingStore {
    async fn save(&self, _document: &TransactionDocument) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("document store is down".to_string()))
    }
}

/// Saves into memory, logging entry and exit around an optional delay.
pub struct TracingStore {
    pub log: EventLog,
    pub delay: Duration,
    pub saved: Mutex<Vec<TransactionDocument>>,
}

impl TracingStore {
    pub fn new(log: EventLog, delay: Duration) -> Self {
        Self {
            log,
            delay,
            saved: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TransactionStore for TracingStore {
    async fn save(&self, document: &TransactionDocument) -> Result<(), StoreError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("save-start:{}", document.from_ulid));
        tokio::time::sleep(self.delay).await;
        self.saved.lock().unwrap().push(document.clone());
        self.log
            .lock()
            .unwrap()
            .push(format!("save-end:{}", document.from_ulid));
        Ok(())
    }
}

/// In-memory key-value store that logs every access.
pub struct TracingKv {
    pub log: EventLog,
    pub inner: MemoryKeyValueStore,
}

#[async_trait]
impl KeyValueStore for TracingKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.log.lock().unwrap().push(format!("get:{key}"));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.log.lock().unwrap().push(format!("set:{key}"));
        self.inner.set(key, value).await
    }
}

pub struct FailingKv;

#[async_trait]
impl KeyValueStore for FailingKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("cache is down".to_string()))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("cache is down".to_string()))
    }
}

/// Acknowledges everything except payloads `boom` (returns an error) and
/// `panic` (panics). Remembers what it saw.
#[derive(Default)]
pub struct ScriptedHandler {
    pub handled: Mutex<Vec<String>>,
    pub dead_letters: Mutex<Vec<String>>,
}

#[async_trait]
impl MessageHandler for ScriptedHandler {
    async fn handle(&self, record: &ConsumerRecord, ack: &dyn Acknowledgment) -> anyhow::Result<()> {
        let payload = record.value_lossy().to_string();
        self.handled.lock().unwrap().push(payload.clone());
        match payload.as_str() {
            "boom" => anyhow::bail!("scripted failure"),
            "panic" => panic!("scripted panic"),
            _ => {
                ack.acknowledge().await?;
                Ok(())
            }
        }
    }

    async fn handle_dlq(&self, record: &ConsumerRecord, _ack: &dyn Acknowledgment) {
        self.dead_letters
            .lock()
            .unwrap()
            .push(record.value_lossy().to_string());
    }
}
