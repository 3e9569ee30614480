//! JSON codec trait definition.

use serde_json::Value;

use crate::errors::MeiliError;

/// Encodes request bodies and decodes response bodies.
///
/// Implementations are interchangeable; the document operations only ever go
/// through this trait.
pub trait JsonHandler: Send + Sync + std::fmt::Debug {
    /// Encode a value to bytes.
    fn dumps(&self, value: &Value) -> Result<Vec<u8>, MeiliError>;

    /// Decode bytes to a value.
    fn loads(&self, bytes: &[u8]) -> Result<Value, MeiliError>;
}
