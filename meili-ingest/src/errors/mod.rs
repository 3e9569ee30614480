//! Error types for document ingestion.

use meili_client::MeiliError;
use thiserror::Error;

/// Errors that can occur while loading and submitting documents.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error from the client, including validation of the input.
    #[error(transparent)]
    Client(#[from] MeiliError),

    /// Failed to read a file or directory.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Malformed JSON or NDJSON input.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A directory contained no file of the requested format.
    #[error("No {format} files found in {directory}")]
    NoDocuments { format: String, directory: String },

    /// A background parsing job was cancelled or panicked.
    #[error("Ingest cancelled")]
    Cancelled,
}

impl IngestError {
    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// The underlying client error, if any.
    pub fn as_client_error(&self) -> Option<&MeiliError> {
        match self {
            Self::Client(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        Self::CsvError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(_: tokio::task::JoinError) -> Self {
        Self::Cancelled
    }
}
