//! Client error types.
//!
//! This module defines the error taxonomy shared by the transport, the task
//! poller, the plugin pipeline and the document operations.

use thiserror::Error;

use super::ApiError;

/// Errors that can occur while talking to the server.
#[derive(Error, Debug, Clone)]
pub enum MeiliError {
    /// Failed to reach the server (connect, timeout, protocol).
    #[error("Communication error: {0}")]
    CommunicationError(String),

    /// The server answered with a non-success status.
    #[error("{0}")]
    ApiError(ApiError),

    /// A task did not reach a terminal status before the deadline.
    ///
    /// The operation may still be running server-side.
    #[error("Timeout of {timeout_ms}ms exceeded waiting for task {task_uid}")]
    TimeoutError { task_uid: u64, timeout_ms: u128 },

    /// A waited-on task finished with the `failed` status.
    #[error("Task {0} failed")]
    TaskFailed(u64),

    /// Input rejected before any network call.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Documents are not a list of key-value records.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Failed to encode a request or decode a response.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A plugin reported a failure.
    #[error("Plugin '{name}' failed: {message}")]
    PluginError { name: String, message: String },
}

impl MeiliError {
    /// Create a communication error.
    pub fn communication(msg: impl Into<String>) -> Self {
        Self::CommunicationError(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create an invalid document error.
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a plugin error.
    pub fn plugin(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::PluginError {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Status code of the response, when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError(e) => Some(e.status_code),
            _ => None,
        }
    }
}

impl From<ApiError> for MeiliError {
    fn from(err: ApiError) -> Self {
        Self::ApiError(err)
    }
}

impl From<serde_json::Error> for MeiliError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
