use std::sync::Arc;

use crate::broker::{Broker, TopicConsumer};
use crate::core::handler::MessageHandler;
use crate::store::{KeyValueStore, TransactionStore};

pub type SharedHandler = Arc<dyn MessageHandler>;
pub type SharedBroker = Arc<dyn Broker>;
pub type SharedConsumer = Arc<dyn TopicConsumer>;
pub type SharedTransactionStore = Arc<dyn TransactionStore>;
pub type SharedKeyValueStore = Arc<dyn KeyValueStore>;
