//! JSON and binary persistence for curves.
//!
//! Decoding validates the result, so a document that parses but describes
//! an impossible curve is rejected.

use curvekit_core::traits::Validate;
use curvekit_core::{KernelError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| KernelError::Serialization(e.to_string()))
}

pub fn from_json<T: DeserializeOwned + Validate>(json: &str) -> Result<T> {
    let value: T =
        serde_json::from_str(json).map_err(|e| KernelError::Serialization(e.to_string()))?;
    checked(value)
}

pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| KernelError::Serialization(e.to_string()))
}

pub fn from_bytes<T: DeserializeOwned + Validate>(bytes: &[u8]) -> Result<T> {
    let value: T =
        bincode::deserialize(bytes).map_err(|e| KernelError::Serialization(e.to_string()))?;
    checked(value)
}

fn checked<T: Validate>(value: T) -> Result<T> {
    value.validate().map_err(|e| {
        debug!(error = %e, "decoded curve failed validation");
        e
    })?;
    Ok(value)
}
