use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::DecodeError;

// `%.f` also matches an absent fraction; the second form is what
// ISO-8601 writers emit when seconds are zero ("2024-01-01T10:00").
const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// ISO-8601 local date-time as carried on the wire.
///
/// Keeps the original text so encoding is byte-identical to what was decoded.
#[derive(Debug, Clone)]
pub struct EventTime {
    at: NaiveDateTime,
    text: String,
}

impl EventTime {
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .map(|at| Self {
                at,
                text: text.to_string(),
            })
            .ok_or_else(|| DecodeError::InvalidTime(text.to_string()))
    }

    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for EventTime {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for EventTime {}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        EventTime::parse(&text).map_err(serde::de::Error::custom)
    }
}
