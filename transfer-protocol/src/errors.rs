use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid amount {text:?}: {reason}")]
    InvalidAmount { text: String, reason: String },

    #[error("Invalid ISO-8601 local date-time {0:?}")]
    InvalidTime(String),
}
