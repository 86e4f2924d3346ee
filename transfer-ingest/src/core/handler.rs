use async_trait::async_trait;
use transfer_protocol::ConsumerRecord;

use crate::broker::BrokerError;

/// Lets a handler mark its record as done so the offset can be committed.
#[async_trait]
pub trait Acknowledgment: Send + Sync {
    async fn acknowledge(&self) -> Result<(), BrokerError>;
}

/// Per-topic record callback.
///
/// `handle` owns the decision to acknowledge. Whatever escapes it, an `Err`
/// or a panic, is caught by the pipeline and handed to `handle_dlq`.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, record: &ConsumerRecord, ack: &dyn Acknowledgment) -> anyhow::Result<()>;

    async fn handle_dlq(&self, record: &ConsumerRecord, ack: &dyn Acknowledgment);
}
