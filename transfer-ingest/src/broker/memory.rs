use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};
use transfer_protocol::ConsumerRecord;

use crate::broker::offset_tracker::OffsetTracker;
use crate::broker::topic::Topic;
use crate::broker::{Broker, BrokerError, Subscription, TopicConsumer};
use crate::config::{LocalBrokerConfig, OffsetReset};
use crate::types::SharedConsumer;

struct BrokerState {
    topics: HashMap<String, Topic>,
    offsets: OffsetTracker,
}

impl BrokerState {
    fn ensure_topic(&mut self, name: &str, config: &LocalBrokerConfig) -> Result<&mut Topic, BrokerError> {
        if !self.topics.contains_key(name) {
            if !config.auto_create_topics {
                return Err(BrokerError::NoTopic(name.to_string()));
            }
            debug!(topic = %name, partitions = config.partitions, "auto-creating topic");
            self.topics
                .insert(name.to_string(), Topic::new(name.to_string(), config.partitions));
        }
        self.topics
            .get_mut(name)
            .ok_or_else(|| BrokerError::NoTopic(name.to_string()))
    }
}

/// Process-local broker with consumer groups and manual offset commits.
///
/// A subscription starts each partition at the group's committed offset, so
/// records that were polled but never committed come back the next time the
/// group subscribes.
#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
    config: LocalBrokerConfig,
}

impl MemoryBroker {
    pub fn new(config: LocalBrokerConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState {
                topics: HashMap::new(),
                offsets: OffsetTracker::new(),
            })),
            notify: Arc::new(Notify::new()),
            config,
        }
    }

    pub async fn create_topic(&self, name: &str, partition_count: Option<u32>) {
        let mut state = self.state.lock().await;
        let partitions = partition_count.unwrap_or(self.config.partitions);
        state
            .topics
            .entry(name.to_string())
            .or_insert_with(|| Topic::new(name.to_string(), partitions));
    }

    // returns (partition_id, offset)
    pub async fn produce(
        &self,
        topic: &str,
        key: Option<Bytes>,
        value: impl Into<Bytes>,
    ) -> Result<(u32, u64), BrokerError> {
        let timestamp = chrono::Utc::now().timestamp_millis() as u64;
        let placed = {
            let mut state = self.state.lock().await;
            state
                .ensure_topic(topic, &self.config)?
                .produce(key, value.into(), timestamp)
        };
        self.notify.notify_waiters();
        Ok(placed)
    }

    pub async fn committed(&self, group: &str, topic: &str, partition: u32) -> Option<u64> {
        self.state.lock().await.offsets.fetch(group, topic, partition)
    }

    pub async fn log_end_offset(&self, topic: &str, partition: u32) -> Result<u64, BrokerError> {
        let state = self.state.lock().await;
        state
            .topics
            .get(topic)
            .ok_or_else(|| BrokerError::NoTopic(topic.to_string()))?
            .log_end_offset(partition)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn subscribe(&self, subscription: &Subscription) -> Result<Vec<SharedConsumer>, BrokerError> {
        let mut state = self.state.lock().await;
        let partition_count = state
            .ensure_topic(&subscription.topic, &self.config)?
            .partition_count();

        let members = subscription.members.max(1);
        if members > partition_count as usize {
            warn!(
                topic = %subscription.topic,
                members,
                partition_count,
                "more consumers than partitions; some will stay idle"
            );
        }

        let mut consumers: Vec<SharedConsumer> = Vec::with_capacity(members);
        for member in 0..members {
            let assignment: Vec<u32> = (0..partition_count)
                .filter(|p| *p as usize % members == member)
                .collect();

            let mut positions = HashMap::with_capacity(assignment.len());
            for &partition in &assignment {
                let committed = state
                    .offsets
                    .fetch(&subscription.group, &subscription.topic, partition);
                let start = match committed {
                    Some(offset) => offset,
                    None => match subscription.offset_reset {
                        OffsetReset::Earliest => 0,
                        OffsetReset::Latest => state
                            .ensure_topic(&subscription.topic, &self.config)?
                            .log_end_offset(partition)?,
                    },
                };
                positions.insert(partition, start);
            }

            debug!(
                topic = %subscription.topic,
                group = %subscription.group,
                member,
                ?assignment,
                ?positions,
                "consumer assigned"
            );

            consumers.push(Arc::new(MemoryConsumer {
                state: Arc::clone(&self.state),
                notify: Arc::clone(&self.notify),
                topic: subscription.topic.clone(),
                group: subscription.group.clone(),
                assignment,
                positions: Mutex::new(positions),
                cursor: AtomicUsize::new(0),
            }));
        }
        Ok(consumers)
    }
}

struct MemoryConsumer {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
    topic: String,
    group: String,
    assignment: Vec<u32>,
    positions: Mutex<HashMap<u32, u64>>,
    cursor: AtomicUsize, // rotates the first partition read so none starves
}

impl MemoryConsumer {
    async fn fetch(&self, max_records: usize) -> Result<Vec<ConsumerRecord>, BrokerError> {
        let mut batch = Vec::new();
        if self.assignment.is_empty() || max_records == 0 {
            return Ok(batch);
        }

        let state = self.state.lock().await;
        let topic = state
            .topics
            .get(&self.topic)
            .ok_or_else(|| BrokerError::NoTopic(self.topic.clone()))?;
        let mut positions = self.positions.lock().await;

        let n = self.assignment.len();
        let first = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        for i in 0..n {
            let remaining = max_records - batch.len();
            if remaining == 0 {
                break;
            }
            let partition = self.assignment[(first + i) % n];
            let from = positions.get(&partition).copied().unwrap_or(0);
            let records = topic.read(partition, from, remaining)?;
            if let Some(last) = records.last() {
                positions.insert(partition, last.offset + 1);
            }
            batch.extend(records);
        }
        Ok(batch)
    }
}

#[async_trait]
impl TopicConsumer for MemoryConsumer {
    fn assignment(&self) -> Vec<u32> {
        self.assignment.clone()
    }

    async fn poll(&self, max_records: usize, timeout: Duration) -> Result<Vec<ConsumerRecord>, BrokerError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before looking so a produce in between is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let batch = self.fetch(max_records).await?;
            if !batch.is_empty() {
                return Ok(batch);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(batch);
            }
        }
    }

    async fn commit(&self, partition: u32, next_offset: u64) -> Result<(), BrokerError> {
        if !self.assignment.contains(&partition) {
            return Err(BrokerError::NotAssigned { partition });
        }
        let mut state = self.state.lock().await;
        let advanced = state
            .offsets
            .commit(&self.group, &self.topic, partition, next_offset);
        debug!(
            topic = %self.topic,
            group = %self.group,
            partition,
            next_offset,
            advanced,
            "offset committed"
        );
        Ok(())
    }
}
