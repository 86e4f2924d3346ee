use thiserror::Error;
use transfer_protocol::DecodeError;

use crate::broker::BrokerError;
use crate::core::history_cache::CacheError;
use crate::store::StoreError;

/// Startup failures. Any of these aborts before a pipeline is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Topic [{0}] not supported yet")]
    UnsupportedTopic(String),

    #[error("Topic [{topic}] has invalid {field}: must be at least 1")]
    InvalidTopic { topic: String, field: &'static str },
}

/// Why a single record was left unacknowledged.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to decode transaction: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to persist transaction: {0}")]
    Persistence(#[source] StoreError),

    #[error("Failed to update history cache: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to acknowledge record: {0}")]
    Acknowledge(#[source] BrokerError),
}
