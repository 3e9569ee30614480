//! JSON codec implementations.
//!
//! [`BuiltinHandler`] uses `serde_json` and is always available. The SIMD
//! backed handlers are enabled with the `simd-json` and `sonic-rs` features.

use serde_json::Value;

use crate::errors::MeiliError;
use crate::interfaces::JsonHandler;

/// Codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinHandler;

impl JsonHandler for BuiltinHandler {
    fn dumps(&self, value: &Value) -> Result<Vec<u8>, MeiliError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn loads(&self, bytes: &[u8]) -> Result<Value, MeiliError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Codec backed by `simd-json`.
#[cfg(feature = "simd-json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SimdJsonHandler;

#[cfg(feature = "simd-json")]
impl JsonHandler for SimdJsonHandler {
    fn dumps(&self, value: &Value) -> Result<Vec<u8>, MeiliError> {
        simd_json::serde::to_vec(value).map_err(|e| MeiliError::serialization(e.to_string()))
    }

    fn loads(&self, bytes: &[u8]) -> Result<Value, MeiliError> {
        // simd-json parses in place.
        let mut buffer = bytes.to_vec();
        simd_json::serde::from_slice(&mut buffer)
            .map_err(|e| MeiliError::serialization(e.to_string()))
    }
}

/// Codec backed by `sonic-rs`.
#[cfg(feature = "sonic-rs")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SonicHandler;

#[cfg(feature = "sonic-rs")]
impl JsonHandler for SonicHandler {
    fn dumps(&self, value: &Value) -> Result<Vec<u8>, MeiliError> {
        sonic_rs::to_vec(value).map_err(|e| MeiliError::serialization(e.to_string()))
    }

    fn loads(&self, bytes: &[u8]) -> Result<Value, MeiliError> {
        sonic_rs::from_slice(bytes).map_err(|e| MeiliError::serialization(e.to_string()))
    }
}
