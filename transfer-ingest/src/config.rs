use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::TRANSACTIONS_TOPIC;

/// Everything the service reads at startup. Loaded once, then only read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub kafka: KafkaConfig,

    /// Knobs for the in-process broker the binary runs against.
    pub broker: LocalBrokerConfig,

    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub topics: BTreeMap<String, TopicProperties>,
    pub info: KafkaInfo,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        let mut topics = BTreeMap::new();
        topics.insert(TRANSACTIONS_TOPIC.to_string(), TopicProperties::default());
        Self {
            topics,
            info: KafkaInfo::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicProperties {
    /// How long one poll waits for records, in milliseconds.
    pub poll_interval_ms: u64,
    /// Number of workers polling this topic.
    pub concurrency: usize,
    /// Upper bound on records returned by a single poll.
    pub max_poll_records: usize,
    pub enabled: bool,
}

impl Default for TopicProperties {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            concurrency: 1,
            max_poll_records: 500,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaInfo {
    pub bootstrap_servers: String,
    pub consumer: ConsumerSettings,
}

impl Default for KafkaInfo {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            consumer: ConsumerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    pub group_id: String,
    pub auto_offset_reset: OffsetReset,
    /// Accepted for compatibility only; pipelines always acknowledge manually.
    pub auto_commit: bool,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            group_id: "my-consumer-group".to_string(),
            auto_offset_reset: OffsetReset::Earliest,
            auto_commit: false,
        }
    }
}

/// Where a group starts on a partition it has never committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetReset {
    #[default]
    Earliest,
    Latest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalBrokerConfig {
    /// Partition count for topics created on demand.
    pub partitions: u32,
    pub auto_create_topics: bool,
}

impl Default for LocalBrokerConfig {
    fn default() -> Self {
        Self {
            partitions: 3,
            auto_create_topics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_dir: PathBuf,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data"),
            collection: "transfer_history".to_string(),
        }
    }
}

impl IngestConfig {
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::read_from_file(p), // propagate errors unchanged
            None => Ok(Self::default()),
        }
    }

    fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {:?}", path.as_ref()))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let cfg: IngestConfig = toml::from_str(raw).with_context(|| "parsing ingest config TOML")?;
        Ok(cfg)
    }
}
