//! Response body decoding.
//!
//! The `Decoder` trait stays object-safe by producing a `serde_json::Value`;
//! `decode` finishes the job for any `DeserializeOwned` target.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;

pub trait Decoder: Send + Sync {
    fn decode_value(&self, body: &[u8]) -> Result<Value, DecodeError>;
}

/// Decode `body` into `T` using `decoder`.
pub fn decode<T: DeserializeOwned>(decoder: &dyn Decoder, body: &[u8]) -> Result<T, DecodeError> {
    let value = decoder.decode_value(body)?;
    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Keys are matched exactly as they appear in the payload.
    #[default]
    UseDefaultKeys,
    /// `camelCase` keys become `snake_case` before typed decoding.
    ConvertFromCamelCase,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder {
    pub key_strategy: KeyStrategy,
}

impl JsonDecoder {
    pub fn new(key_strategy: KeyStrategy) -> Self {
        Self { key_strategy }
    }
}

impl Decoder for JsonDecoder {
    fn decode_value(&self, body: &[u8]) -> Result<Value, DecodeError> {
        let value: Value = serde_json::from_slice(body)?;
        Ok(match self.key_strategy {
            KeyStrategy::UseDefaultKeys => value,
            KeyStrategy::ConvertFromCamelCase => convert_keys(value),
        })
    }
}

fn convert_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (snake_case(&key), convert_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(convert_keys).collect()),
        other => other,
    }
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
