use crate::errors::DecodeError;
use crate::transaction::{HistoryRecord, TransactionDocument, TransactionEvent};

pub fn decode_event(payload: &[u8]) -> Result<TransactionEvent, DecodeError> {
    Ok(serde_json::from_slice(payload)?)
}

pub fn encode_event(event: &TransactionEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

pub fn encode_document(doc: &TransactionDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string(doc)
}

/// Cache values are JSON arrays, most recent first.
pub fn decode_history(raw: &str) -> Result<Vec<HistoryRecord>, DecodeError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn encode_history(records: &[HistoryRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string(records)
}
