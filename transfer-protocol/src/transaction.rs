/*
Wire payload on the `transactions` topic (UTF-8 JSON, unknown keys ignored):

{
  "fromUlid": "...", "fromName": "...", "fromAccountID": "...",
  "toUlid":   "...", "toName":   "...", "toAccountID":   "...",
  "value": "100.50",
  "time":  "2024-01-01T10:00:00"
}
*/
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::time::EventTime;

/// A bank transfer as published by the producer side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    #[serde(rename = "fromUlid")]
    pub from_ulid: String,
    #[serde(rename = "fromName")]
    pub from_name: String,
    #[serde(rename = "fromAccountID")]
    pub from_account_id: String,

    #[serde(rename = "toUlid")]
    pub to_ulid: String,
    #[serde(rename = "toName")]
    pub to_name: String,
    #[serde(rename = "toAccountID")]
    pub to_account_id: String,

    pub value: Amount,
    pub time: EventTime,
}

/// Canonical persisted form of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDocument {
    #[serde(rename = "fromUlid")]
    pub from_ulid: String,
    #[serde(rename = "toUlid")]
    pub to_ulid: String,
    pub value: Amount,
    pub time: EventTime,
}

/// One entry of an account's recent-activity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "fromUlid")]
    pub from_ulid: String,
    #[serde(rename = "fromUser")]
    pub from_user: String,
    #[serde(rename = "toUlid")]
    pub to_ulid: String,
    #[serde(rename = "toUser")]
    pub to_user: String,
    pub value: Amount,
    pub time: EventTime,
}

impl TransactionEvent {
    pub fn to_document(&self) -> TransactionDocument {
        TransactionDocument {
            from_ulid: self.from_ulid.clone(),
            to_ulid: self.to_ulid.clone(),
            value: self.value.clone(),
            time: self.time.clone(),
        }
    }

    pub fn to_history_record(&self) -> HistoryRecord {
        HistoryRecord {
            from_ulid: self.from_ulid.clone(),
            from_user: self.from_name.clone(),
            to_ulid: self.to_ulid.clone(),
            to_user: self.to_name.clone(),
            value: self.value.clone(),
            time: self.time.clone(),
        }
    }
}
