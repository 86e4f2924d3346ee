pub mod broker;
mod config;
pub mod core;
pub mod runtime;
pub mod server;
pub mod store;
pub mod types;

pub use config::{
    ConsumerSettings, IngestConfig, KafkaConfig, KafkaInfo, LocalBrokerConfig, OffsetReset,
    StoreConfig, TopicProperties,
};
