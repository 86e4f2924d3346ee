pub mod amount;
pub mod codec;
pub mod errors;
pub mod message;
pub mod time;
pub mod transaction;

// Public re-exports for easy access
pub use amount::{Amount, AmountForm};
pub use errors::DecodeError;
pub use message::ConsumerRecord;
pub use time::EventTime;
pub use transaction::{HistoryRecord, TransactionDocument, TransactionEvent};

pub use codec::{decode_event, decode_history, encode_document, encode_event, encode_history};
