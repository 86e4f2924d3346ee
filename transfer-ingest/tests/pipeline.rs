mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use transfer_ingest::broker::{Broker, BrokerError, MemoryBroker, Subscription};
use transfer_ingest::core::pipeline::{deliver, OffsetAcknowledgment};
use transfer_ingest::core::{
    dispatcher::handler_map, history_cache_key, ConfigError, Dispatcher, HandlerMap, HistoryCache,
    TopicRegistry, TransactionHandler, TRANSACTIONS_TOPIC,
};
use transfer_ingest::core::Acknowledgment;
use transfer_ingest::store::{MemoryKeyValueStore, MemoryTransactionStore};
use transfer_ingest::types::{SharedBroker, SharedConsumer, SharedHandler};
use transfer_ingest::{KafkaConfig, LocalBrokerConfig, OffsetReset, TopicProperties};

use crate::common::{event_json, eventually, history, record, RecordingAck, ScriptedHandler};

const GROUP: &str = "my-consumer-group";

fn fast_topic() -> TopicProperties {
    TopicProperties {
        poll_interval_ms: 50,
        concurrency: 1,
        max_poll_records: 10,
        enabled: true,
    }
}

fn kafka_config(topics: &[(&str, TopicProperties)]) -> KafkaConfig {
    KafkaConfig {
        topics: topics
            .iter()
            .map(|(name, props)| (name.to_string(), props.clone()))
            .collect::<BTreeMap<_, _>>(),
        ..KafkaConfig::default()
    }
}

fn registry(topics: &[(&str, TopicProperties)]) -> Arc<TopicRegistry> {
    Arc::new(TopicRegistry::from_config(&kafka_config(topics)).expect("valid registry"))
}

fn single_partition_broker() -> MemoryBroker {
    MemoryBroker::new(LocalBrokerConfig {
        partitions: 1,
        auto_create_topics: true,
    })
}

struct Service {
    store: Arc<MemoryTransactionStore>,
    cache: HistoryCache,
    handlers: HandlerMap,
}

fn service() -> Service {
    let store = Arc::new(MemoryTransactionStore::new());
    let kv = Arc::new(MemoryKeyValueStore::new());
    let handler = Arc::new(TransactionHandler::new(store.clone(), kv.clone()));
    Service {
        store,
        cache: HistoryCache::new(kv),
        handlers: handler_map(handler),
    }
}

/// Counts subscriptions and refuses all of them.
#[derive(Default)]
struct CountingBroker {
    subscriptions: AtomicUsize,
}

#[async_trait]
impl Broker for CountingBroker {
    async fn subscribe(&self, subscription: &Subscription) -> Result<Vec<SharedConsumer>, BrokerError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        Err(BrokerError::NoTopic(subscription.topic.clone()))
    }
}

/// Runs the startup sequence the binary uses: registry, dispatcher, start.
async fn start_service(registry: Arc<TopicRegistry>, handlers: &HandlerMap, broker: SharedBroker) -> Result<(), ConfigError> {
    let dispatcher = Dispatcher::new(registry, handlers)?;
    dispatcher.start(broker).await.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_unknown_enabled_topic_is_rejected_before_any_subscription() {
    let broker = Arc::new(CountingBroker::default());
    let registry = registry(&[(TRANSACTIONS_TOPIC, fast_topic()), ("audit", fast_topic())]);

    let err = start_service(registry, &service().handlers, broker.clone())
        .await
        .expect_err("audit has no handler");

    assert!(matches!(&err, ConfigError::UnsupportedTopic(t) if t == "audit"));
    assert_eq!(err.to_string(), "Topic [audit] not supported yet");
    assert_eq!(broker.subscriptions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_known_topics_reach_the_broker() {
    let broker = Arc::new(CountingBroker::default());
    let registry = registry(&[(TRANSACTIONS_TOPIC, fast_topic())]);

    start_service(registry, &service().handlers, broker.clone())
        .await
        .expect("transactions is served");

    assert_eq!(broker.subscriptions.load(Ordering::SeqCst), 1);
}

#[test]
fn test_disabled_unknown_topic_is_ignored() {
    let audit = TopicProperties {
        enabled: false,
        ..fast_topic()
    };
    let registry = registry(&[(TRANSACTIONS_TOPIC, fast_topic()), ("audit", audit)]);

    let dispatcher = Dispatcher::new(registry, &service().handlers).expect("audit is disabled");
    assert_eq!(dispatcher.topics(), vec![TRANSACTIONS_TOPIC]);
    assert_eq!(dispatcher.registry().len(), 2);
}

#[tokio::test]
async fn test_failed_topic_does_not_block_the_others() {
    let broker = MemoryBroker::new(LocalBrokerConfig {
        partitions: 1,
        auto_create_topics: false,
    });
    broker.create_topic(TRANSACTIONS_TOPIC, None).await;

    let scripted: SharedHandler = Arc::new(ScriptedHandler::default());
    let mut handlers = service().handlers;
    handlers.insert("audit".to_string(), scripted);

    let registry = registry(&[(TRANSACTIONS_TOPIC, fast_topic()), ("audit", fast_topic())]);
    let dispatcher = Dispatcher::new(registry, &handlers).expect("both topics are served");

    let running = dispatcher.start(Arc::new(broker) as SharedBroker).await;
    assert_eq!(running.started(), vec![TRANSACTIONS_TOPIC]);
    assert_eq!(running.failed().len(), 1);
    assert_eq!(running.failed()[0].0, "audit");
    assert!(matches!(running.failed()[0].1, BrokerError::NoTopic(_)));

    running.shutdown().await;
}

#[tokio::test]
async fn test_record_flows_to_store_cache_and_commit() {
    let broker = single_partition_broker();
    let svc = service();
    let key = history_cache_key("U1", "A1");
    svc.cache.set(&key, &[history("U0"), history("U00")]).await.unwrap();

    let dispatcher =
        Dispatcher::new(registry(&[(TRANSACTIONS_TOPIC, fast_topic())]), &svc.handlers).unwrap();
    let running = dispatcher.start(Arc::new(broker.clone()) as SharedBroker).await;

    broker
        .produce(TRANSACTIONS_TOPIC, None, event_json("U1", "A1", "100.50"))
        .await
        .unwrap();

    let committed = eventually(|| {
        let broker = broker.clone();
        async move {
            let committed = broker.committed(GROUP, TRANSACTIONS_TOPIC, 0).await;
            committed == Some(1)
        }
    })
    .await;
    assert!(committed, "record was never acknowledged");

    let docs = svc.store.documents().await;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].value.as_str(), "100.50");

    let cached = svc.cache.get(&key).await.unwrap().unwrap();
    let ids: Vec<&str> = cached.iter().map(|r| r.from_ulid.as_str()).collect();
    assert_eq!(ids, vec!["U1", "U0"]);

    running.shutdown().await;
}

#[tokio::test]
async fn test_malformed_record_is_never_committed() {
    let broker = single_partition_broker();
    let svc = service();
    let dispatcher =
        Dispatcher::new(registry(&[(TRANSACTIONS_TOPIC, fast_topic())]), &svc.handlers).unwrap();
    let running = dispatcher.start(Arc::new(broker.clone()) as SharedBroker).await;

    broker
        .produce(TRANSACTIONS_TOPIC, None, "{\"fromUlid\": 12")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(broker.committed(GROUP, TRANSACTIONS_TOPIC, 0).await, None);
    assert!(svc.store.documents().await.is_empty());

    running.shutdown().await;
}

/// Errors and panics go to the DLQ, stay uncommitted, and the worker keeps
/// going. A restarted group gets the uncommitted records again.
#[tokio::test]
async fn test_escaped_failures_go_to_dlq_and_are_redelivered() {
    let broker = single_partition_broker();
    let scripted = Arc::new(ScriptedHandler::default());
    let mut handlers = HandlerMap::new();
    handlers.insert(TRANSACTIONS_TOPIC.to_string(), scripted.clone() as SharedHandler);

    let dispatcher =
        Dispatcher::new(registry(&[(TRANSACTIONS_TOPIC, fast_topic())]), &handlers).unwrap();

    broker.produce(TRANSACTIONS_TOPIC, None, "boom").await.unwrap();
    broker.produce(TRANSACTIONS_TOPIC, None, "panic").await.unwrap();

    let running = dispatcher.start(Arc::new(broker.clone()) as SharedBroker).await;
    let dead = eventually(|| {
        let scripted = scripted.clone();
        async move {
            let dead = scripted.dead_letters.lock().unwrap().len();
            dead == 2
        }
    })
    .await;
    assert!(dead, "both failures should reach the DLQ");
    assert_eq!(*scripted.dead_letters.lock().unwrap(), vec!["boom", "panic"]);
    assert_eq!(broker.committed(GROUP, TRANSACTIONS_TOPIC, 0).await, None);

    // The worker survived the panic and keeps consuming.
    broker.produce(TRANSACTIONS_TOPIC, None, "ok").await.unwrap();
    let moved = eventually(|| {
        let broker = broker.clone();
        async move {
            let committed = broker.committed(GROUP, TRANSACTIONS_TOPIC, 0).await;
            committed == Some(3)
        }
    })
    .await;
    assert!(moved);
    running.shutdown().await;

    // Nothing uncommitted is left behind once "ok" advanced the offset.
    let handled_before = scripted.handled.lock().unwrap().len();
    let running = dispatcher.start(Arc::new(broker.clone()) as SharedBroker).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(scripted.handled.lock().unwrap().len(), handled_before);
    running.shutdown().await;
}

#[tokio::test]
async fn test_uncommitted_records_come_back_after_restart() {
    let broker = single_partition_broker();
    let scripted = Arc::new(ScriptedHandler::default());
    let mut handlers = HandlerMap::new();
    handlers.insert(TRANSACTIONS_TOPIC.to_string(), scripted.clone() as SharedHandler);
    let dispatcher =
        Dispatcher::new(registry(&[(TRANSACTIONS_TOPIC, fast_topic())]), &handlers).unwrap();

    broker.produce(TRANSACTIONS_TOPIC, None, "boom").await.unwrap();

    let running = dispatcher.start(Arc::new(broker.clone()) as SharedBroker).await;
    assert!(
        eventually(|| {
            let scripted = scripted.clone();
            async move {
                let handled = scripted.handled.lock().unwrap().len();
                handled == 1
            }
        })
        .await
    );
    running.shutdown().await;

    let running = dispatcher.start(Arc::new(broker.clone()) as SharedBroker).await;
    assert!(
        eventually(|| {
            let scripted = scripted.clone();
            async move {
                let handled = scripted.handled.lock().unwrap().len();
                handled == 2
            }
        })
        .await,
        "uncommitted record should be redelivered"
    );
    running.shutdown().await;

    assert_eq!(*scripted.handled.lock().unwrap(), vec!["boom", "boom"]);
}

#[tokio::test]
async fn test_acknowledgment_commits_next_offset_once() {
    let broker = single_partition_broker();
    broker.produce(TRANSACTIONS_TOPIC, None, "x").await.unwrap();
    let consumers = broker
        .subscribe(&Subscription {
            topic: TRANSACTIONS_TOPIC.to_string(),
            group: GROUP.to_string(),
            members: 1,
            offset_reset: OffsetReset::Earliest,
        })
        .await
        .unwrap();

    let ack = OffsetAcknowledgment::new(Arc::clone(&consumers[0]), 0, 0);
    ack.acknowledge().await.unwrap();
    ack.acknowledge().await.unwrap();

    assert!(ack.is_acknowledged());
    assert_eq!(broker.committed(GROUP, TRANSACTIONS_TOPIC, 0).await, Some(1));
}

#[tokio::test]
async fn test_deliver_contains_handler_panics() {
    let scripted = ScriptedHandler::default();
    let ack = RecordingAck::new();

    deliver(&scripted, &record(0, "panic"), &ack).await;
    deliver(&scripted, &record(1, "fine"), &ack).await;

    assert_eq!(*scripted.dead_letters.lock().unwrap(), vec!["panic"]);
    assert_eq!(ack.count(), 1);
}
