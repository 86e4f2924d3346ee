//! Broker seam. The pipeline only needs to subscribe a group to a topic,
//! poll records and commit offsets; `MemoryBroker` is the local
//! implementation used by the binary and the tests.

mod memory;
mod offset_tracker;
mod topic;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use transfer_protocol::ConsumerRecord;

use crate::config::OffsetReset;
use crate::types::SharedConsumer;

pub use memory::MemoryBroker;
pub use offset_tracker::OffsetTracker;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Topic [{0}] does not exist")]
    NoTopic(String),

    #[error("Partition {partition} does not exist in topic [{topic}]")]
    NoPartition { topic: String, partition: u32 },

    #[error("Partition {partition} is not assigned to this consumer")]
    NotAssigned { partition: u32 },

    #[error("Unexpected broker error: {0}")]
    Other(String),
}

/// What a pipeline asks the broker for when it starts.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub topic: String,
    pub group: String,
    /// One consumer is returned per member.
    pub members: usize,
    pub offset_reset: OffsetReset,
}

#[async_trait]
pub trait Broker: Send + Sync {
    async fn subscribe(&self, subscription: &Subscription) -> Result<Vec<SharedConsumer>, BrokerError>;
}

/// One group member's view of a topic. Commits are manual.
#[async_trait]
pub trait TopicConsumer: Send + Sync {
    fn assignment(&self) -> Vec<u32>;

    /// Returns up to `max_records`, waiting at most `timeout` when nothing
    /// is available. An empty batch is not an error.
    async fn poll(&self, max_records: usize, timeout: Duration) -> Result<Vec<ConsumerRecord>, BrokerError>;

    /// `next_offset` is the offset of the next record the group should read.
    async fn commit(&self, partition: u32, next_offset: u64) -> Result<(), BrokerError>;
}
