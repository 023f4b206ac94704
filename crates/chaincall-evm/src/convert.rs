//! Total conversions for raw reply values.
//!
//! Replies come back as numbers, decimal or hex strings, or booleans depending
//! on the ABI type and its size. Each helper takes an explicit fallback and
//! never fails.

use std::str::FromStr;

use alloy_primitives::U256;
use serde_json::Value;

/// Integer view of `value`, or `fallback` if it is not a non-negative
/// integer that fits in 64 bits.
pub fn to_u64(value: &Value, fallback: u64) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(fallback),
        Value::String(s) => parse_u64(s.trim()).unwrap_or(fallback),
        Value::Bool(b) => u64::from(*b),
        _ => fallback,
    }
}

fn parse_u64(s: &str) -> Option<u64> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

pub fn to_bool(value: &Value, fallback: bool) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_u64() {
            Some(0) => false,
            Some(1) => true,
            _ => fallback,
        },
        Value::String(s) => match s.trim() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => fallback,
        },
        _ => fallback,
    }
}

/// Text view of `value`. Numbers and booleans are rendered; `null`, arrays
/// and objects give `fallback`.
pub fn to_text(value: &Value, fallback: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => fallback.to_string(),
    }
}

pub fn to_u256(value: &Value, fallback: U256) -> U256 {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from).unwrap_or(fallback),
        Value::String(s) => U256::from_str(s.trim()).unwrap_or(fallback),
        Value::Bool(b) => U256::from(u8::from(*b)),
        _ => fallback,
    }
}

/// Access one field of a multi-output reply by name, or by position when the
/// reply was shaped as an array.
pub fn field<'a>(reply: &'a Value, index: usize, name: &str) -> Option<&'a Value> {
    match reply {
        Value::Object(map) => map.get(name),
        Value::Array(items) => items.get(index),
        _ => None,
    }
}
