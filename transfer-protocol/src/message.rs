use std::borrow::Cow;

use bytes::Bytes;

/// A record as handed to a consumer: where it came from plus the raw payload.
#[derive(Debug, Clone)]
pub struct ConsumerRecord {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: Option<Bytes>, // Optional record key (used for partitioning)
    pub value: Bytes,       // Record body, undecoded
    pub timestamp: u64,     // Unix epoch in millis
}

impl ConsumerRecord {
    /// Payload rendered for logs; invalid UTF-8 is replaced, never rejected.
    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}
