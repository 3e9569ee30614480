//! Index plugin trait definition.
//!
//! Plugins extend document and search operations with behaviour that runs
//! before the request (validation, redaction), alongside it (telemetry, audit)
//! or after it (result post-processing). Which hooks a plugin implements and
//! when it runs is declared once in its [`PluginRegistration`].
//!
//! [`PluginRegistration`]: crate::plugins::PluginRegistration

use async_trait::async_trait;

use crate::errors::MeiliError;
use meili_shared::{
    Document, FacetSearchQuery, FacetSearchResults, Filter, SearchQuery, SearchResults, TaskInfo,
};

/// The phase a plugin is invoked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginEvent {
    Pre,
    Concurrent,
    Post,
}

/// Result of an operation, as seen and possibly replaced by plugins.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginOutcome {
    Task(TaskInfo),
    Search(SearchResults),
    FacetSearch(FacetSearchResults),
}

impl PluginOutcome {
    /// Whether both outcomes are of the same kind.
    pub fn same_kind(&self, other: &PluginOutcome) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// What an operation was invoked with, or what it produced in the post phase.
#[derive(Debug, Clone, Copy)]
pub enum PluginPayload<'a> {
    Documents {
        documents: &'a [Document],
        primary_key: Option<&'a str>,
    },
    DocumentId(&'a str),
    DocumentIds(&'a [String]),
    Filter(&'a Filter),
    AllDocuments,
    Search(&'a SearchQuery),
    FacetSearch(&'a FacetSearchQuery),
    Outcome(&'a PluginOutcome),
}

/// An extension of index operations.
///
/// Every hook defaults to doing nothing; a plugin overrides the ones its
/// registration declares. Returning `Ok(Some(..))` proposes a replacement,
/// returning an error aborts the operation.
#[async_trait]
pub trait IndexPlugin: Send + Sync {
    /// Generic hook, available for every operation kind.
    ///
    /// A returned outcome replaces the operation result when it is of the same
    /// kind (concurrent and post phases).
    async fn run_plugin(
        &self,
        _event: PluginEvent,
        _payload: PluginPayload<'_>,
    ) -> Result<Option<PluginOutcome>, MeiliError> {
        Ok(None)
    }

    /// Document transform hook for add and update operations.
    ///
    /// In the pre phase a returned list replaces the documents sent to the server.
    async fn run_document_plugin(
        &self,
        _event: PluginEvent,
        _documents: &[Document],
        _primary_key: Option<&str>,
    ) -> Result<Option<Vec<Document>>, MeiliError> {
        Ok(None)
    }

    /// Search transform hook, run on the results of a search.
    async fn run_post_search_plugin(
        &self,
        _event: PluginEvent,
        _results: &SearchResults,
    ) -> Result<Option<SearchResults>, MeiliError> {
        Ok(None)
    }
}
