use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::watch::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use transfer_protocol::ConsumerRecord;

use crate::broker::{BrokerError, Subscription};
use crate::config::OffsetReset;
use crate::core::handler::{Acknowledgment, MessageHandler};
use crate::core::registry::TopicPipelineSpec;
use crate::types::{SharedBroker, SharedConsumer, SharedHandler};

/// Everything a pipeline needs to know about its topic.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub topic: String,
    pub group: String,
    pub offset_reset: OffsetReset,
    pub spec: TopicPipelineSpec,
}

/// Acknowledgment bound to one polled record. Acknowledging commits
/// `offset + 1` for the record's partition; repeated calls commit once.
pub struct OffsetAcknowledgment {
    consumer: SharedConsumer,
    partition: u32,
    offset: u64,
    acked: AtomicBool,
}

impl OffsetAcknowledgment {
    pub fn new(consumer: SharedConsumer, partition: u32, offset: u64) -> Self {
        Self {
            consumer,
            partition,
            offset,
            acked: AtomicBool::new(false),
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Acknowledgment for OffsetAcknowledgment {
    async fn acknowledge(&self) -> Result<(), BrokerError> {
        if self.acked.swap(true, Ordering::SeqCst) {
            debug!(partition = self.partition, offset = self.offset, "record already acknowledged");
            return Ok(());
        }
        if let Err(e) = self.consumer.commit(self.partition, self.offset + 1).await {
            self.acked.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }
}

/// Hands one record to `handler`. Errors and panics escaping `handle` go to
/// `handle_dlq`; nothing escapes this function.
pub async fn deliver(handler: &dyn MessageHandler, record: &ConsumerRecord, ack: &dyn Acknowledgment) {
    let failure = match AssertUnwindSafe(handler.handle(record, ack)).catch_unwind().await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{e:#}"),
        Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
    };

    warn!(
        topic = %record.topic,
        partition = record.partition,
        offset = record.offset,
        error = %failure,
        "record handler failed; routing to DLQ"
    );
    if AssertUnwindSafe(handler.handle_dlq(record, ack))
        .catch_unwind()
        .await
        .is_err()
    {
        error!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            "DLQ handler panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

/// One topic's consumers: `spec.concurrency` workers in the same group, each
/// polling its own partitions and feeding records to the handler in order.
pub struct ConsumerPipeline {
    settings: PipelineSettings,
    handler: SharedHandler,
}

impl ConsumerPipeline {
    pub fn new(settings: PipelineSettings, handler: SharedHandler) -> Self {
        Self { settings, handler }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn start(&self, broker: &SharedBroker, shutdown: Receiver<bool>) -> Result<PipelineHandle, BrokerError> {
        let subscription = Subscription {
            topic: self.settings.topic.clone(),
            group: self.settings.group.clone(),
            members: self.settings.spec.concurrency,
            offset_reset: self.settings.offset_reset,
        };
        let consumers = broker.subscribe(&subscription).await?;

        let workers = consumers
            .into_iter()
            .enumerate()
            .map(|(id, consumer)| {
                let worker = Worker {
                    id,
                    topic: self.settings.topic.clone(),
                    consumer,
                    handler: Arc::clone(&self.handler),
                    poll_interval: self.settings.spec.poll_interval,
                    max_poll_records: self.settings.spec.max_poll_records,
                };
                tokio::spawn(worker.run(shutdown.clone()))
            })
            .collect();

        Ok(PipelineHandle {
            topic: self.settings.topic.clone(),
            workers,
        })
    }
}

pub struct PipelineHandle {
    topic: String,
    workers: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker to stop. Workers only stop on shutdown.
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(topic = %self.topic, error = %e, "consumer worker terminated abnormally");
            }
        }
    }
}

struct Worker {
    id: usize,
    topic: String,
    consumer: SharedConsumer,
    handler: SharedHandler,
    poll_interval: Duration,
    max_poll_records: usize,
}

impl Worker {
    async fn run(self, mut shutdown: Receiver<bool>) {
        info!(
            topic = %self.topic,
            worker = self.id,
            partitions = ?self.consumer.assignment(),
            "consumer worker started"
        );

        'poll: while !*shutdown.borrow() {
            let polled = tokio::select! {
                biased;
                _ = shutdown.changed() => break 'poll,
                polled = self.consumer.poll(self.max_poll_records, self.poll_interval) => polled,
            };

            let records = match polled {
                Ok(records) => records,
                Err(e) => {
                    error!(topic = %self.topic, worker = self.id, error = %e, "poll failed");
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
            };

            for record in records {
                // Records after this point stay uncommitted and are redelivered.
                if *shutdown.borrow() {
                    break 'poll;
                }
                let ack = OffsetAcknowledgment::new(Arc::clone(&self.consumer), record.partition, record.offset);
                deliver(self.handler.as_ref(), &record, &ack).await;
            }
        }

        info!(topic = %self.topic, worker = self.id, "consumer worker stopped");
    }
}
