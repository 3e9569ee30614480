//! # Meili Shared
//!
//! Data types shared by the client and ingest crates: task handles returned by
//! the server, documents, and the search request/response shapes the core
//! operations need.

pub mod document;
pub mod search;
pub mod task;

pub use document::Document;
pub use search::{
    FacetHit, FacetSearchQuery, FacetSearchResults, Filter, MatchingStrategy, SearchQuery,
    SearchResults,
};
pub use task::{TaskError, TaskInfo, TaskList, TaskResult, TaskStatus};
