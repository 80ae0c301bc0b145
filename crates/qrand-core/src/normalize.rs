//! Response normalization.
//!
//! Turns a parsed JSON body into a flat integer sequence according to the
//! source's success predicate and data field.

use serde_json::Value;

use crate::attempt::AttemptFailure;
use crate::source::{lookup, SourceDescriptor};

/// Body fields that commonly carry an upstream error description.
const MESSAGE_FIELDS: [&str; 3] = ["message", "error", "reason"];

/// Stateless converter from source payloads to integer sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    /// Decide success and extract the numbers.
    ///
    /// A body whose success predicate fails is still accepted when it carries
    /// the data field, which covers sources without an explicit success flag.
    pub fn normalize(
        &self,
        body: &Value,
        descriptor: &SourceDescriptor,
    ) -> Result<Vec<i64>, AttemptFailure> {
        let data = lookup(body, descriptor.data_field());
        let succeeded = descriptor.success().evaluate(body) || data.is_some();

        if !succeeded {
            return Err(AttemptFailure::api_reported(format!(
                "{} reported failure: {}",
                descriptor.name(),
                upstream_message(body).unwrap_or("unknown")
            )));
        }

        let Some(data) = data else {
            return Err(AttemptFailure::unexpected_shape(format!(
                "success signalled but field '{}' is missing",
                descriptor.data_field()
            )));
        };

        let numbers = extract_numbers(data).map_err(|reason| {
            AttemptFailure::unexpected_shape(format!(
                "field '{}' {reason}",
                descriptor.data_field()
            ))
        })?;

        if numbers.is_empty() {
            return Err(AttemptFailure::unexpected_shape(format!(
                "field '{}' holds no numbers",
                descriptor.data_field()
            )));
        }

        Ok(numbers)
    }
}

fn extract_numbers(data: &Value) -> Result<Vec<i64>, String> {
    match data {
        Value::String(text) => decode_hex(text),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_i64()
                    .ok_or_else(|| format!("element {index} is not an integer: {item}"))
            })
            .collect(),
        Value::Null => Err(String::from("is null")),
        other => Err(format!("has unsupported type: {}", type_name(other))),
    }
}

/// Decode a hexadecimal string into big-endian byte values.
fn decode_hex(text: &str) -> Result<Vec<i64>, String> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(String::from("is a string but not hexadecimal"));
    }

    hex::decode(text)
        .map(|bytes| bytes.into_iter().map(i64::from).collect())
        .map_err(|error| format!("is not valid hex: {error}"))
}

fn upstream_message(body: &Value) -> Option<&str> {
    MESSAGE_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
