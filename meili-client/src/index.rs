//! Index handle: document, deletion and search operations.
//!
//! Every operation runs through the plugin phases registered for its kind.
//! Batched variants split the input, submit the first batch on its own (the
//! server creates the index on first write and concurrent creations race),
//! then fan the remaining batches out through the client's [`Executor`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use url::form_urlencoded;

use crate::batching::split;
use crate::errors::MeiliError;
use crate::executor::Executor;
use crate::http::HttpRequests;
use crate::interfaces::{HttpMethod, PluginOutcome, PluginPayload};
use crate::plugins::{IndexPlugins, OperationKind, PluginPipeline, PluginTable};
use crate::tasks::{Tasks, WaitOptions};
use meili_shared::{
    Document, FacetSearchQuery, FacetSearchResults, Filter, SearchQuery, SearchResults, TaskInfo,
    TaskResult,
};

/// Default number of documents per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Per-request options of the document operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Gzip the request body.
    pub compress: bool,
    /// Free-form metadata stored with the resulting task.
    pub custom_metadata: Option<String>,
}

/// Options of the batched document operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub primary_key: Option<String>,
    pub compress: bool,
    pub custom_metadata: Option<String>,
    /// Maximum number of batches in flight; falls back to the client's limit.
    pub concurrency_limit: Option<NonZeroUsize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            primary_key: None,
            compress: false,
            custom_metadata: None,
            concurrency_limit: None,
        }
    }
}

impl BatchOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = Some(primary_key.into());
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_custom_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.custom_metadata = Some(metadata.into());
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = NonZeroUsize::new(limit);
        self
    }

    fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            compress: self.compress,
            custom_metadata: self.custom_metadata.clone(),
        }
    }
}

/// Handle on one index.
///
/// Cheap to clone; the connection and the classified plugins are shared.
#[derive(Debug, Clone)]
pub struct Index {
    uid: String,
    http: HttpRequests,
    executor: Executor,
    plugins: Arc<PluginTable>,
    tasks: Tasks,
}

impl Index {
    pub(crate) fn new(
        uid: impl Into<String>,
        http: HttpRequests,
        executor: Executor,
        plugins: &IndexPlugins,
    ) -> Self {
        let uid = uid.into();
        let table = PluginTable::classify(plugins);
        if !plugins.is_empty() {
            info!(index_uid = %uid, "Registered index plugins");
        }
        Self {
            tasks: Tasks::new(http.clone(), executor),
            uid,
            http,
            executor,
            plugins: Arc::new(table),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn executor(&self) -> Executor {
        self.executor
    }

    /// Add documents, replacing existing documents with the same id.
    #[instrument(skip(self, documents, options), fields(index_uid = %self.uid, document_count = documents.len()))]
    pub async fn add_documents(
        &self,
        documents: &[Document],
        primary_key: Option<&str>,
        options: &DocumentOptions,
    ) -> Result<TaskInfo, MeiliError> {
        self.submit_documents(OperationKind::AddDocuments, documents, primary_key, options)
            .await
    }

    /// Add documents in batches of `options.batch_size`.
    ///
    /// The returned task handles are in batch order.
    #[instrument(skip(self, documents, options), fields(index_uid = %self.uid, document_count = documents.len(), batch_size = options.batch_size))]
    pub async fn add_documents_in_batches(
        &self,
        documents: &[Document],
        options: &BatchOptions,
    ) -> Result<Vec<TaskInfo>, MeiliError> {
        self.submit_in_batches(OperationKind::AddDocuments, documents, options)
            .await
    }

    /// Update documents, merging fields into existing documents.
    #[instrument(skip(self, documents, options), fields(index_uid = %self.uid, document_count = documents.len()))]
    pub async fn update_documents(
        &self,
        documents: &[Document],
        primary_key: Option<&str>,
        options: &DocumentOptions,
    ) -> Result<TaskInfo, MeiliError> {
        self.submit_documents(OperationKind::UpdateDocuments, documents, primary_key, options)
            .await
    }

    /// Update documents in batches of `options.batch_size`.
    #[instrument(skip(self, documents, options), fields(index_uid = %self.uid, document_count = documents.len(), batch_size = options.batch_size))]
    pub async fn update_documents_in_batches(
        &self,
        documents: &[Document],
        options: &BatchOptions,
    ) -> Result<Vec<TaskInfo>, MeiliError> {
        self.submit_in_batches(OperationKind::UpdateDocuments, documents, options)
            .await
    }

    #[instrument(skip(self), fields(index_uid = %self.uid))]
    pub async fn delete_document(&self, document_id: &str) -> Result<TaskInfo, MeiliError> {
        let path = format!(
            "indexes/{}/documents/{}",
            self.uid,
            encode_path_segment(document_id)
        );
        let outcome = self
            .pipeline(OperationKind::DeleteDocument)
            .run(PluginPayload::DocumentId(document_id), async {
                self.http.delete(&path).await.map(PluginOutcome::Task)
            })
            .await?;
        into_task(outcome)
    }

    #[instrument(skip(self, ids), fields(index_uid = %self.uid, document_count = ids.len()))]
    pub async fn delete_documents(&self, ids: &[String]) -> Result<TaskInfo, MeiliError> {
        let path = format!("indexes/{}/documents/delete-batch", self.uid);
        let outcome = self
            .pipeline(OperationKind::DeleteDocuments)
            .run(PluginPayload::DocumentIds(ids), async {
                self.http
                    .post(&path, Some(ids), false)
                    .await
                    .map(PluginOutcome::Task)
            })
            .await?;
        into_task(outcome)
    }

    #[instrument(skip(self, filter), fields(index_uid = %self.uid))]
    pub async fn delete_documents_by_filter(&self, filter: &Filter) -> Result<TaskInfo, MeiliError> {
        let outcome = self
            .pipeline(OperationKind::DeleteDocumentsByFilter)
            .run(PluginPayload::Filter(filter), self.send_filter_deletion(filter))
            .await?;
        into_task(outcome)
    }

    /// Delete by several filters, one task per filter, in filter order.
    #[instrument(skip(self, filters), fields(index_uid = %self.uid, filter_count = filters.len()))]
    pub async fn delete_documents_in_batches_by_filter(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<TaskInfo>, MeiliError> {
        let Some((first, rest)) = filters.split_first() else {
            return Ok(Vec::new());
        };

        let mut tasks = vec![self.delete_documents_by_filter(first).await?];
        tasks.extend(
            self.executor
                .join_all(rest.iter().map(|filter| self.delete_documents_by_filter(filter)))
                .await?,
        );
        Ok(tasks)
    }

    #[instrument(skip(self), fields(index_uid = %self.uid))]
    pub async fn delete_all_documents(&self) -> Result<TaskInfo, MeiliError> {
        let path = format!("indexes/{}/documents", self.uid);
        let outcome = self
            .pipeline(OperationKind::DeleteAllDocuments)
            .run(PluginPayload::AllDocuments, async {
                self.http.delete(&path).await.map(PluginOutcome::Task)
            })
            .await?;
        into_task(outcome)
    }

    #[instrument(skip(self, query), fields(index_uid = %self.uid, q = ?query.q))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, MeiliError> {
        let path = format!("indexes/{}/search", self.uid);
        let outcome = self
            .pipeline(OperationKind::Search)
            .run(PluginPayload::Search(query), async {
                self.http
                    .post(&path, Some(query), false)
                    .await
                    .map(PluginOutcome::Search)
            })
            .await?;
        match outcome {
            PluginOutcome::Search(results) => Ok(results),
            other => Err(unexpected_outcome(&other)),
        }
    }

    #[instrument(skip(self, query), fields(index_uid = %self.uid, facet = %query.facet_name))]
    pub async fn facet_search(
        &self,
        query: &FacetSearchQuery,
    ) -> Result<FacetSearchResults, MeiliError> {
        let path = format!("indexes/{}/facet-search", self.uid);
        let outcome = self
            .pipeline(OperationKind::FacetSearch)
            .run(PluginPayload::FacetSearch(query), async {
                self.http
                    .post(&path, Some(query), false)
                    .await
                    .map(PluginOutcome::FacetSearch)
            })
            .await?;
        match outcome {
            PluginOutcome::FacetSearch(results) => Ok(results),
            other => Err(unexpected_outcome(&other)),
        }
    }

    /// Wait for a task enqueued on this index.
    pub async fn wait_for_task(
        &self,
        task_uid: u64,
        options: &WaitOptions,
    ) -> Result<TaskResult, MeiliError> {
        self.tasks.wait_for_task(task_uid, options).await
    }

    /// Wait for several tasks, results in the order of `tasks`.
    pub async fn wait_for_tasks(
        &self,
        tasks: &[TaskInfo],
        options: &WaitOptions,
    ) -> Result<Vec<TaskResult>, MeiliError> {
        self.tasks.wait_for_tasks(tasks, options).await
    }

    fn pipeline(&self, kind: OperationKind) -> PluginPipeline<'_> {
        PluginPipeline::new(kind, self.plugins.get(kind), self.executor)
    }

    async fn submit_documents(
        &self,
        kind: OperationKind,
        documents: &[Document],
        primary_key: Option<&str>,
        options: &DocumentOptions,
    ) -> Result<TaskInfo, MeiliError> {
        let pipeline = self.pipeline(kind);
        let transformed = pipeline
            .pre(PluginPayload::Documents {
                documents,
                primary_key,
            })
            .await?;
        let documents = transformed.as_deref().unwrap_or(documents);

        let path = self.documents_path(primary_key, options.custom_metadata.as_deref());
        let method = match kind {
            OperationKind::UpdateDocuments => HttpMethod::Put,
            _ => HttpMethod::Post,
        };
        debug!(method = method.as_str(), path = %path, documents = documents.len(), "Submitting documents");

        let call = async {
            let task: Result<TaskInfo, MeiliError> = match method {
                HttpMethod::Put => self.http.put(&path, Some(documents), options.compress).await,
                _ => self.http.post(&path, Some(documents), options.compress).await,
            };
            task.map(PluginOutcome::Task)
        };
        let outcome = pipeline
            .execute(
                PluginPayload::Documents {
                    documents,
                    primary_key,
                },
                call,
            )
            .await?;
        into_task(outcome)
    }

    async fn submit_in_batches(
        &self,
        kind: OperationKind,
        documents: &[Document],
        options: &BatchOptions,
    ) -> Result<Vec<TaskInfo>, MeiliError> {
        let batches = split(documents, options.batch_size)?;
        let Some((first, rest)) = batches.split_first() else {
            return Ok(Vec::new());
        };

        let primary_key = options.primary_key.as_deref();
        let document_options = options.document_options();
        let executor = self.executor.with_limit(options.concurrency_limit);
        debug!(
            batches = batches.len(),
            limit = ?executor.limit(),
            "Dispatching document batches"
        );

        let mut tasks = vec![
            self.submit_documents(kind, first, primary_key, &document_options)
                .await?,
        ];
        tasks.extend(
            executor
                .join_all(rest.iter().map(|batch| {
                    self.submit_documents(kind, batch, primary_key, &document_options)
                }))
                .await?,
        );
        Ok(tasks)
    }

    async fn send_filter_deletion(&self, filter: &Filter) -> Result<PluginOutcome, MeiliError> {
        let path = format!("indexes/{}/documents/delete", self.uid);
        let body = serde_json::json!({ "filter": filter });
        self.http
            .post(&path, Some(&body), false)
            .await
            .map(PluginOutcome::Task)
    }

    fn documents_path(&self, primary_key: Option<&str>, custom_metadata: Option<&str>) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(primary_key) = primary_key {
            serializer.append_pair("primaryKey", primary_key);
        }
        if let Some(metadata) = custom_metadata {
            serializer.append_pair("customMetadata", metadata);
        }
        let query = serializer.finish();

        if query.is_empty() {
            format!("indexes/{}/documents", self.uid)
        } else {
            format!("indexes/{}/documents?{}", self.uid, query)
        }
    }
}

fn into_task(outcome: PluginOutcome) -> Result<TaskInfo, MeiliError> {
    match outcome {
        PluginOutcome::Task(task) => Ok(task),
        other => Err(unexpected_outcome(&other)),
    }
}

fn unexpected_outcome(outcome: &PluginOutcome) -> MeiliError {
    MeiliError::serialization(format!("Unexpected operation result: {:?}", outcome))
}

/// Percent-encode a document id for use as a path segment.
fn encode_path_segment(segment: &str) -> String {
    // form encoding writes spaces as '+' and escapes a literal '+'.
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
