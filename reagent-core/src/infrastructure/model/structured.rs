//! Typed results from raw model text.

use crate::application::parser::extract_json;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructuredError {
    #[error("model output contains no JSON value")]
    NoJson,
    #[error("model output does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Finds the JSON value in `raw`: the whole text, a fenced block, or the
/// outermost braces.
pub fn extract(raw: &str) -> Result<Value, StructuredError> {
    extract_json(raw).ok_or(StructuredError::NoJson)
}

pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, StructuredError> {
    decode_value(extract(raw)?)
}

pub fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, StructuredError> {
    Ok(serde_json::from_value(value)?)
}
