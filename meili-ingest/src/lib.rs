//! # Meili Ingest
//!
//! Loads documents from files, directories or in-memory producers and
//! submits them to an index.
//!
//! ## Architecture
//!
//! 1. **Source**: parses JSON, NDJSON and CSV files into documents
//! 2. **Loader**: submits documents through an [`Index`](meili_client::Index),
//!    in one request or in batches, and optionally waits for the tasks

pub mod errors;
pub mod loader;
pub mod source;

pub use errors::IngestError;
pub use loader::{DocumentLoader, LoadSummary, LoaderConfig, LoaderOperation};
pub use source::{load_documents_from_file, DocumentFormat};
