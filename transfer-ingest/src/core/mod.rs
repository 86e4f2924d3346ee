pub mod dispatcher;
mod error;
pub mod handler;
pub mod history_cache;
pub mod pipeline;
pub mod registry;
pub mod transaction_handler;

pub use dispatcher::{Dispatcher, HandlerMap, RunningPipelines};
pub use error::{ConfigError, IngestError};
pub use handler::{Acknowledgment, MessageHandler};
pub use history_cache::{history_cache_key, CacheError, CacheUpdate, HistoryCache};
pub use registry::{ConsumerIdentity, TopicPipelineSpec, TopicRegistry};
pub use transaction_handler::{Processed, TransactionHandler};

pub const TRANSACTIONS_TOPIC: &str = "transactions";
