//! Error types for the Meilisearch client.

mod api_error;
mod meili_error;

pub use api_error::ApiError;
pub use meili_error::MeiliError;
