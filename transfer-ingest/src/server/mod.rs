mod params;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use params::Params;

use crate::broker::MemoryBroker;
use crate::config::IngestConfig;
use crate::core::dispatcher::handler_map;
use crate::core::{Dispatcher, TopicRegistry, TransactionHandler, TRANSACTIONS_TOPIC};
use crate::runtime;
use crate::store::{JsonlTransactionStore, MemoryKeyValueStore};
use crate::types::{SharedBroker, SharedKeyValueStore};

pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .compact()
        .init();
}

/// Wires the service together and runs it until Ctrl-C.
pub async fn start(params: Params) -> anyhow::Result<()> {
    init_tracing(&params.log_level);

    let mut config = IngestConfig::load_or_default(params.config.as_ref())?;
    if let Some(base_dir) = params.base_dir {
        config.store.base_dir = base_dir;
    }
    info!("transfer-ingest starting with config: {:?}", config);

    let registry = Arc::new(TopicRegistry::from_config(&config.kafka)?);

    let store = Arc::new(
        JsonlTransactionStore::open(&config.store.base_dir, &config.store.collection)
            .context("opening transaction store")?,
    );
    let cache_store: SharedKeyValueStore = Arc::new(MemoryKeyValueStore::new());
    if let Some(path) = params.seed_history {
        runtime::seed_history(Arc::clone(&cache_store), path).await?;
    }

    let handlers = handler_map(Arc::new(TransactionHandler::new(store, Arc::clone(&cache_store))));
    // Unknown topics abort here, before any consumer exists.
    let dispatcher = Dispatcher::new(Arc::clone(&registry), &handlers)?;

    let broker = MemoryBroker::new(config.broker.clone());
    info!(
        bootstrap_servers = %registry.consumer().bootstrap_servers,
        "using in-process broker"
    );
    if let Some(path) = params.replay {
        runtime::replay_file(&broker, TRANSACTIONS_TOPIC, path).await?;
    }

    let shared: SharedBroker = Arc::new(broker);
    let running = dispatcher.start(shared).await;
    info!(started = ?running.started(), failed = running.failed().len(), "dispatcher running");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    running.shutdown().await;
    Ok(())
}
