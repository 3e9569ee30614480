//! Blocking flavor of the client.
//!
//! Runs the async implementation on an owned current-thread runtime with the
//! sequential executor, so batches and concurrent plugins execute one after
//! the other. Must not be used from inside an async runtime.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::config::ClientConfig;
use crate::errors::MeiliError;
use crate::executor::ExecutionMode;
use crate::index::{BatchOptions, DocumentOptions};
use crate::interfaces::{JsonHandler, Transport};
use crate::plugins::IndexPlugins;
use crate::tasks::{TaskFilter, WaitOptions};
use meili_shared::{
    Document, FacetSearchQuery, FacetSearchResults, Filter, SearchQuery, SearchResults, TaskInfo,
    TaskList, TaskResult,
};

fn runtime() -> Result<Arc<Runtime>, MeiliError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map(Arc::new)
        .map_err(|e| MeiliError::communication(format!("Failed to start runtime: {}", e)))
}

fn sequential(config: ClientConfig) -> ClientConfig {
    config.with_execution_mode(ExecutionMode::Sequential)
}

/// Blocking client.
#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::Client,
    runtime: Arc<Runtime>,
}

impl Client {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, MeiliError> {
        let mut config = ClientConfig::new(url);
        config.api_key = api_key;
        Self::with_config(config)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, MeiliError> {
        Ok(Self {
            inner: crate::Client::with_config(sequential(config))?,
            runtime: runtime()?,
        })
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
    ) -> Result<Self, MeiliError> {
        Ok(Self {
            inner: crate::Client::with_transport(transport, sequential(config)),
            runtime: runtime()?,
        })
    }

    pub fn with_json_handler(self, json: Arc<dyn JsonHandler>) -> Self {
        Self {
            inner: self.inner.with_json_handler(json),
            runtime: self.runtime,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    pub fn batch_options(&self) -> BatchOptions {
        self.inner.batch_options()
    }

    pub fn index(&self, uid: impl Into<String>) -> Index {
        Index {
            inner: self.inner.index(uid),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn index_with_plugins(&self, uid: impl Into<String>, plugins: &IndexPlugins) -> Index {
        Index {
            inner: self.inner.index_with_plugins(uid, plugins),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<TaskInfo, MeiliError> {
        self.runtime.block_on(self.inner.create_index(uid, primary_key))
    }

    pub fn delete_index(&self, uid: &str) -> Result<TaskInfo, MeiliError> {
        self.runtime.block_on(self.inner.delete_index(uid))
    }

    pub fn is_healthy(&self) -> bool {
        self.runtime.block_on(self.inner.is_healthy())
    }

    pub fn get_task(&self, task_uid: u64) -> Result<TaskResult, MeiliError> {
        self.runtime.block_on(self.inner.get_task(task_uid))
    }

    pub fn get_tasks(&self, filter: &TaskFilter) -> Result<TaskList, MeiliError> {
        self.runtime.block_on(self.inner.get_tasks(filter))
    }

    pub fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo, MeiliError> {
        self.runtime.block_on(self.inner.cancel_tasks(filter))
    }

    pub fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo, MeiliError> {
        self.runtime.block_on(self.inner.delete_tasks(filter))
    }

    pub fn wait_for_task(
        &self,
        task_uid: u64,
        options: Option<&WaitOptions>,
    ) -> Result<TaskResult, MeiliError> {
        self.runtime
            .block_on(self.inner.wait_for_task(task_uid, options))
    }

    pub fn wait_for_tasks(
        &self,
        tasks: &[TaskInfo],
        options: Option<&WaitOptions>,
    ) -> Result<Vec<TaskResult>, MeiliError> {
        self.runtime.block_on(self.inner.wait_for_tasks(tasks, options))
    }
}

/// Blocking index handle.
#[derive(Debug, Clone)]
pub struct Index {
    inner: crate::Index,
    runtime: Arc<Runtime>,
}

impl Index {
    pub fn uid(&self) -> &str {
        self.inner.uid()
    }

    pub fn add_documents(
        &self,
        documents: &[Document],
        primary_key: Option<&str>,
        options: &DocumentOptions,
    ) -> Result<TaskInfo, MeiliError> {
        self.runtime
            .block_on(self.inner.add_documents(documents, primary_key, options))
    }

    pub fn add_documents_in_batches(
        &self,
        documents: &[Document],
        options: &BatchOptions,
    ) -> Result<Vec<TaskInfo>, MeiliError> {
        self.runtime
            .block_on(self.inner.add_documents_in_batches(documents, options))
    }

    pub fn update_documents(
        &self,
        documents: &[Document],
        primary_key: Option<&str>,
        options: &DocumentOptions,
    ) -> Result<TaskInfo, MeiliError> {
        self.runtime
            .block_on(self.inner.update_documents(documents, primary_key, options))
    }

    pub fn update_documents_in_batches(
        &self,
        documents: &[Document],
        options: &BatchOptions,
    ) -> Result<Vec<TaskInfo>, MeiliError> {
        self.runtime
            .block_on(self.inner.update_documents_in_batches(documents, options))
    }

    pub fn delete_document(&self, document_id: &str) -> Result<TaskInfo, MeiliError> {
        self.runtime.block_on(self.inner.delete_document(document_id))
    }

    pub fn delete_documents(&self, ids: &[String]) -> Result<TaskInfo, MeiliError> {
        self.runtime.block_on(self.inner.delete_documents(ids))
    }

    pub fn delete_documents_by_filter(&self, filter: &Filter) -> Result<TaskInfo, MeiliError> {
        self.runtime
            .block_on(self.inner.delete_documents_by_filter(filter))
    }

    pub fn delete_documents_in_batches_by_filter(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<TaskInfo>, MeiliError> {
        self.runtime
            .block_on(self.inner.delete_documents_in_batches_by_filter(filters))
    }

    pub fn delete_all_documents(&self) -> Result<TaskInfo, MeiliError> {
        self.runtime.block_on(self.inner.delete_all_documents())
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults, MeiliError> {
        self.runtime.block_on(self.inner.search(query))
    }

    pub fn facet_search(&self, query: &FacetSearchQuery) -> Result<FacetSearchResults, MeiliError> {
        self.runtime.block_on(self.inner.facet_search(query))
    }

    pub fn wait_for_task(
        &self,
        task_uid: u64,
        options: &WaitOptions,
    ) -> Result<TaskResult, MeiliError> {
        self.runtime
            .block_on(self.inner.wait_for_task(task_uid, options))
    }

    /// Wait for several tasks, results in the order of `tasks`.
    pub fn wait_for_tasks(
        &self,
        tasks: &[TaskInfo],
        options: &WaitOptions,
    ) -> Result<Vec<TaskResult>, MeiliError> {
        self.runtime.block_on(self.inner.wait_for_tasks(tasks, options))
    }
}
