use std::collections::BTreeMap;
use std::time::Duration;

use tracing::warn;

use crate::config::{KafkaConfig, OffsetReset, TopicProperties};
use crate::core::error::ConfigError;

/// Operating parameters for one topic's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPipelineSpec {
    pub poll_interval: Duration,
    pub max_poll_records: usize,
    pub concurrency: usize,
    pub enabled: bool,
}

impl From<&TopicProperties> for TopicPipelineSpec {
    fn from(p: &TopicProperties) -> Self {
        Self {
            poll_interval: Duration::from_millis(p.poll_interval_ms),
            max_poll_records: p.max_poll_records,
            concurrency: p.concurrency,
            enabled: p.enabled,
        }
    }
}

/// Who we are to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerIdentity {
    pub bootstrap_servers: String,
    pub group_id: String,
    pub auto_offset_reset: OffsetReset,
}

/// Immutable topic table, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct TopicRegistry {
    consumer: ConsumerIdentity,
    topics: BTreeMap<String, TopicPipelineSpec>,
}

impl TopicRegistry {
    pub fn new(
        consumer: ConsumerIdentity,
        topics: BTreeMap<String, TopicPipelineSpec>,
    ) -> Result<Self, ConfigError> {
        for (topic, spec) in topics.iter().filter(|(_, s)| s.enabled) {
            // A zero poll interval turns an idle worker into a busy loop.
            let zero = [
                ("poll_interval_ms", spec.poll_interval.is_zero()),
                ("concurrency", spec.concurrency == 0),
                ("max_poll_records", spec.max_poll_records == 0),
            ];
            if let Some((field, _)) = zero.into_iter().find(|(_, is_zero)| *is_zero) {
                return Err(ConfigError::InvalidTopic {
                    topic: topic.clone(),
                    field,
                });
            }
        }
        Ok(Self { consumer, topics })
    }

    pub fn from_config(config: &KafkaConfig) -> Result<Self, ConfigError> {
        let consumer = &config.info.consumer;
        if consumer.auto_commit {
            warn!("auto_commit is not supported; offsets are committed on acknowledgment only");
        }
        let identity = ConsumerIdentity {
            bootstrap_servers: config.info.bootstrap_servers.clone(),
            group_id: consumer.group_id.clone(),
            auto_offset_reset: consumer.auto_offset_reset,
        };
        let topics = config
            .topics
            .iter()
            .map(|(name, props)| (name.clone(), TopicPipelineSpec::from(props)))
            .collect();
        Self::new(identity, topics)
    }

    pub fn consumer(&self) -> &ConsumerIdentity {
        &self.consumer
    }

    pub fn get(&self, topic: &str) -> Option<&TopicPipelineSpec> {
        self.topics.get(topic)
    }

    pub fn enabled(&self) -> impl Iterator<Item = (&str, &TopicPipelineSpec)> {
        self.topics
            .iter()
            .filter(|(_, spec)| spec.enabled)
            .map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;

    #[test]
    fn test_from_config_carries_identity_and_specs() {
        let cfg = IngestConfig::from_toml(
            r#"
            [kafka.info]
            bootstrap_servers = "broker-1:9092"
            [kafka.info.consumer]
            group_id = "bank-history"

            [kafka.topics.transactions]
            poll_interval_ms = 250
            max_poll_records = 10
            concurrency = 2

            [kafka.topics.refunds]
            enabled = false
            "#,
        )
        .unwrap();
        let registry = TopicRegistry::from_config(&cfg.kafka).unwrap();

        assert_eq!(registry.consumer().group_id, "bank-history");
        assert_eq!(registry.consumer().bootstrap_servers, "broker-1:9092");
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("transactions"),
            Some(&TopicPipelineSpec {
                poll_interval: Duration::from_millis(250),
                max_poll_records: 10,
                concurrency: 2,
                enabled: true,
            })
        );
        let enabled: Vec<&str> = registry.enabled().map(|(name, _)| name).collect();
        assert_eq!(enabled, vec!["transactions"]);
    }

    #[test]
    fn test_zero_concurrency_is_rejected_only_when_enabled() {
        let mut cfg = KafkaConfig::default();
        cfg.topics.insert(
            "refunds".to_string(),
            TopicProperties {
                concurrency: 0,
                enabled: false,
                ..TopicProperties::default()
            },
        );
        assert!(TopicRegistry::from_config(&cfg).is_ok());

        cfg.topics.get_mut("refunds").unwrap().enabled = true;
        let err = TopicRegistry::from_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTopic { field: "concurrency", .. }));
    }

    #[test]
    fn test_zero_batch_is_rejected() {
        let mut cfg = KafkaConfig::default();
        cfg.topics.get_mut("transactions").unwrap().max_poll_records = 0;
        assert!(matches!(
            TopicRegistry::from_config(&cfg),
            Err(ConfigError::InvalidTopic { field: "max_poll_records", .. })
        ));
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let mut cfg = KafkaConfig::default();
        cfg.topics.get_mut("transactions").unwrap().poll_interval_ms = 0;
        let err = TopicRegistry::from_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTopic { field: "poll_interval_ms", .. }));
        assert_eq!(
            err.to_string(),
            "Topic [transactions] has invalid poll_interval_ms: must be at least 1"
        );

        cfg.topics.get_mut("transactions").unwrap().poll_interval_ms = 1;
        assert!(TopicRegistry::from_config(&cfg).is_ok());
    }
}
