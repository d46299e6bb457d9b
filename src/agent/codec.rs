//! Credential value encoding and nonces.
//!
//! Values that fit in a signed 32-bit integer are encoded as themselves; any
//! other value is encoded as the decimal form of the SHA-256 digest of its raw
//! string.

use rand::RngCore;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const I32_BOUND: i64 = 1 << 31;

/// Raw string form of a credential value.
pub fn raw_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Encode a single credential value.
pub fn encode_value(value: &Value) -> String {
    let raw = raw_value(value);
    if !matches!(value, Value::Bool(_)) {
        if let Ok(n) = raw.trim().parse::<i64>() {
            if (-I32_BOUND..I32_BOUND).contains(&n) {
                return n.to_string();
            }
        }
    }
    let digest = Sha256::digest(raw.as_bytes());
    bytes_to_decimal(&digest)
}

/// Encode every value as `{"raw": ..., "encoded": ...}`.
pub fn encode_credential_values(values: &Map<String, Value>) -> Value {
    let encoded = values
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                serde_json::json!({
                    "raw": raw_value(value),
                    "encoded": encode_value(value),
                }),
            )
        })
        .collect();
    Value::Object(encoded)
}

/// Random 80-bit nonce in decimal, for proof requests.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 10];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes_to_decimal(&bytes)
}

/// Big-endian unsigned integer to decimal.
pub fn bytes_to_decimal(bytes: &[u8]) -> String {
    let mut number: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
    if number.is_empty() {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while !number.is_empty() {
        let mut remainder: u32 = 0;
        let mut quotient = Vec::with_capacity(number.len());
        for byte in &number {
            let acc = (remainder << 8) | u32::from(*byte);
            let q = (acc / 10) as u8;
            remainder = acc % 10;
            if !(quotient.is_empty() && q == 0) {
                quotient.push(q);
            }
        }
        digits.push(char::from(b'0' + remainder as u8));
        number = quotient;
    }
    digits.iter().rev().collect()
}
