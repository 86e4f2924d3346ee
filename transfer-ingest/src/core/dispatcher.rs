use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::broker::BrokerError;
use crate::core::error::ConfigError;
use crate::core::pipeline::{ConsumerPipeline, PipelineHandle, PipelineSettings};
use crate::core::registry::TopicRegistry;
use crate::core::transaction_handler::TransactionHandler;
use crate::core::TRANSACTIONS_TOPIC;
use crate::types::{SharedBroker, SharedHandler};

/// Topic name -> handler, fixed before the dispatcher is built.
pub type HandlerMap = HashMap<String, SharedHandler>;

/// Every topic this service knows how to handle.
pub fn handler_map(transactions: Arc<TransactionHandler>) -> HandlerMap {
    let mut handlers = HandlerMap::new();
    handlers.insert(TRANSACTIONS_TOPIC.to_string(), transactions as SharedHandler);
    handlers
}

/// Resolved handlers for every enabled topic. Building one proves the
/// registry is fully served; starting it launches one pipeline per topic.
pub struct Dispatcher {
    registry: Arc<TopicRegistry>,
    pipelines: Vec<ConsumerPipeline>,
}

impl Dispatcher {
    /// Fails on the first enabled topic with no handler, before anything runs.
    pub fn new(registry: Arc<TopicRegistry>, handlers: &HandlerMap) -> Result<Self, ConfigError> {
        let consumer = registry.consumer();
        let mut pipelines = Vec::new();

        for (topic, spec) in registry.enabled() {
            let handler = handlers
                .get(topic)
                .cloned()
                .ok_or_else(|| ConfigError::UnsupportedTopic(topic.to_string()))?;

            let settings = PipelineSettings {
                topic: topic.to_string(),
                group: consumer.group_id.clone(),
                offset_reset: consumer.auto_offset_reset,
                spec: spec.clone(),
            };
            debug!(topic, ?settings, "topic bound to handler");
            pipelines.push(ConsumerPipeline::new(settings, handler));
        }

        Ok(Self {
            registry,
            pipelines,
        })
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn topics(&self) -> Vec<&str> {
        self.pipelines
            .iter()
            .map(|p| p.settings().topic.as_str())
            .collect()
    }

    /// Starts every pipeline. A topic that fails to start is logged and
    /// reported back; the others still start.
    pub async fn start(&self, broker: SharedBroker) -> RunningPipelines {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut started = Vec::new();
        let mut failed = Vec::new();

        for pipeline in &self.pipelines {
            let topic = pipeline.settings().topic.clone();
            match pipeline.start(&broker, shutdown_rx.clone()).await {
                Ok(handle) => {
                    info!(topic = %topic, workers = handle.worker_count(), "Started consumer for topic");
                    started.push(handle);
                }
                Err(e) => {
                    error!(topic = %topic, error = %e, "Failed to start consumer for topic");
                    failed.push((topic, e));
                }
            }
        }

        RunningPipelines {
            shutdown_tx,
            started,
            failed,
        }
    }
}

pub struct RunningPipelines {
    shutdown_tx: watch::Sender<bool>,
    started: Vec<PipelineHandle>,
    failed: Vec<(String, BrokerError)>,
}

impl RunningPipelines {
    pub fn started(&self) -> Vec<&str> {
        self.started.iter().map(|h| h.topic()).collect()
    }

    pub fn failed(&self) -> &[(String, BrokerError)] {
        &self.failed
    }

    /// Stops polling everywhere and waits for in-flight records to finish.
    pub async fn shutdown(self) {
        info!("Shutdown signal received. Stopping consumers...");
        let _ = self.shutdown_tx.send(true);
        for handle in self.started {
            handle.join().await;
        }
        info!("All consumers stopped.");
    }
}
