//! Signature Normalization
//!
//! Wallets answer `near_signTransaction` in whatever shape their SDK
//! serializes a byte buffer to. The shapes seen in practice, in the order
//! they are tried:
//!
//! - raw bytes handed over by an in-process transport
//! - a plain JSON array of numbers
//! - `{ "type": "Buffer", "data": [...] }` (Node `Buffer#toJSON`)
//! - `{ "0": 12, "1": 200, ... }` (a `Uint8Array` run through `JSON.stringify`)
//! - any other object: index keys ascending, then other keys by name
//!
//! Decoding is best-effort: only non-container values are rejected. Whether
//! the bytes form a valid signed transaction is checked separately by the
//! transaction codec.

use crate::error::{BridgeError, BridgeResult};
use serde_json::{Map, Value};

/// Raw value returned by a remote signer
#[derive(Debug, Clone, PartialEq)]
pub enum RawSignature {
    Bytes(Vec<u8>),
    Json(Value),
}

impl From<Vec<u8>> for RawSignature {
    fn from(bytes: Vec<u8>) -> Self {
        RawSignature::Bytes(bytes)
    }
}

impl From<&[u8]> for RawSignature {
    fn from(bytes: &[u8]) -> Self {
        RawSignature::Bytes(bytes.to_vec())
    }
}

impl From<Value> for RawSignature {
    fn from(value: Value) -> Self {
        RawSignature::Json(value)
    }
}

/// Recognized payload shapes, in match priority
#[derive(Debug, Clone, PartialEq)]
pub enum SignaturePayload {
    ByteArray(Vec<u8>),
    NumericSequence(Vec<Value>),
    WrappedData(Vec<Value>),
    SparseIndexed(Map<String, Value>),
    ObjectValues(Map<String, Value>),
}

impl SignaturePayload {
    /// Classify a raw signer value; fails for null and scalars
    pub fn classify(raw: RawSignature) -> BridgeResult<Self> {
        let value = match raw {
            RawSignature::Bytes(bytes) => return Ok(SignaturePayload::ByteArray(bytes)),
            RawSignature::Json(value) => value,
        };

        match value {
            Value::Array(items) => Ok(SignaturePayload::NumericSequence(items)),
            Value::Object(mut map) => {
                if matches!(map.get("data"), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove("data") {
                        return Ok(SignaturePayload::WrappedData(items));
                    }
                }
                if matches!(map.get("0"), Some(Value::Number(_))) {
                    return Ok(SignaturePayload::SparseIndexed(map));
                }
                Ok(SignaturePayload::ObjectValues(map))
            }
            other => Err(BridgeError::malformed_signature(
                "Unexpected result type from near_signTransaction",
            )
            .with_details(value_kind(&other))),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            SignaturePayload::ByteArray(bytes) => bytes,
            SignaturePayload::NumericSequence(items) | SignaturePayload::WrappedData(items) => {
                items.iter().map(to_uint8).collect()
            }
            SignaturePayload::SparseIndexed(map) | SignaturePayload::ObjectValues(map) => {
                object_values(&map).into_iter().map(to_uint8).collect()
            }
        }
    }
}

/// Extract signed-transaction bytes from a remote signer's answer
pub fn normalize(raw: impl Into<RawSignature>) -> BridgeResult<Vec<u8>> {
    Ok(SignaturePayload::classify(raw.into())?.into_bytes())
}

/// Normalize the answer to `near_signTransactions`, one entry per transaction
pub fn normalize_batch(value: Value) -> BridgeResult<Vec<Vec<u8>>> {
    match value {
        Value::Array(items) => items.into_iter().map(normalize).collect(),
        other => Err(BridgeError::malformed_signature(
            "Expected an array from near_signTransactions",
        )
        .with_details(value_kind(&other))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Object values with array-index keys ascending, then the remaining keys
/// sorted by name. Named keys do not keep their insertion order.
fn object_values(map: &Map<String, Value>) -> Vec<&Value> {
    let mut indexed: Vec<(u32, &Value)> = Vec::new();
    let mut named: Vec<&Value> = Vec::new();

    for (key, value) in map {
        match array_index(key) {
            Some(index) => indexed.push((index, value)),
            None => named.push(value),
        }
    }

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, v)| v).chain(named).collect()
}

/// Canonical array index: decimal, no leading zeros, below 2^32 - 1
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|&i| i != u32::MAX)
}

/// `Uint8Array` element conversion: ToNumber, truncate, wrap modulo 256
fn to_uint8(value: &Value) -> u8 {
    let number = to_number(value);
    if !number.is_finite() {
        return 0;
    }
    number.trunc().rem_euclid(256.0) as u8
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => string_to_number(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => to_number(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}
