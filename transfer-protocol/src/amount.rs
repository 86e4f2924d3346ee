use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::errors::DecodeError;

/// How the amount appeared on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountForm {
    /// `"100.50"`
    Text,
    /// `100.50`
    Number,
}

/// Exact monetary amount.
///
/// The decimal value is parsed without rounding and the text it was parsed
/// from is kept verbatim along with its JSON form, so re-encoding yields the
/// exact bytes that came in: `"100.50"` stays `"100.50"` and `100.50` stays
/// `100.50`, never `100.5`. JSON numbers are read as raw text through
/// serde_json's `arbitrary_precision`, so no `f64` is ever involved.
#[derive(Debug, Clone)]
pub struct Amount {
    value: Decimal,
    text: String,
    form: AmountForm,
}

impl Amount {
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            value: parse_decimal(text)?,
            text: text.to_string(),
            form: AmountForm::Text,
        })
    }

    /// Same as [`Amount::parse`] but re-encodes as a bare JSON number.
    /// Exponent notation (`1.5e3`) is accepted here.
    pub fn parse_number(text: &str) -> Result<Self, DecodeError> {
        let value = if text.contains(['e', 'E']) {
            Decimal::from_scientific(text).map_err(|e| invalid(text, e))?
        } else {
            parse_decimal(text)?
        };
        Ok(Self {
            value,
            text: text.to_string(),
            form: AmountForm::Number,
        })
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn form(&self) -> AmountForm {
        self.form
    }
}

fn parse_decimal(text: &str) -> Result<Decimal, DecodeError> {
    Decimal::from_str_exact(text).map_err(|e| invalid(text, e))
}

fn invalid(text: &str, e: rust_decimal::Error) -> DecodeError {
    DecodeError::InvalidAmount {
        text: text.to_string(),
        reason: e.to_string(),
    }
}

impl FromStr for Amount {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl From<i64> for Amount {
    fn from(v: i64) -> Self {
        Self {
            value: Decimal::from(v),
            text: v.to_string(),
            form: AmountForm::Number,
        }
    }
}

// Equal amounts compare by value: "1.0" == "1.00" == 1.0.
impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Amount {}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.form {
            AmountForm::Text => serializer.serialize_str(&self.text),
            AmountForm::Number => Number::from_str(&self.text)
                .map_err(<S::Error as ser::Error>::custom)?
                .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Amount::parse(&text).map_err(de::Error::custom),
            Value::Number(n) => Amount::parse_number(&n.to_string()).map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "expected a decimal string or number, found {other}"
            ))),
        }
    }
}
