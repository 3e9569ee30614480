//! Loader module for document ingestion.
//!
//! Submits documents to an index, in one request or in batches, and
//! optionally waits for the resulting tasks.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::errors::IngestError;
use crate::source::{load_documents_from_file, DocumentFormat};
use meili_client::{BatchOptions, DocumentOptions, Index, WaitOptions};
use meili_shared::{Document, TaskInfo, TaskResult, TaskStatus};

/// How submitted documents are written to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderOperation {
    /// Replace documents with the same id.
    #[default]
    Add,
    /// Merge fields into documents with the same id.
    Update,
}

/// Configuration for the document loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub operation: LoaderOperation,
    /// Documents per request. `None` sends everything in one request.
    pub batch_size: Option<usize>,
    pub primary_key: Option<String>,
    pub compress: bool,
    /// Metadata stored with every task the loader enqueues.
    pub custom_metadata: Option<String>,
    /// Delimiter of CSV files, `,` when unset.
    pub csv_delimiter: Option<char>,
    /// Files of this format are picked from directories.
    pub directory_format: DocumentFormat,
    /// Send all files of a directory as one submission instead of one per file.
    pub combine_documents: bool,
    /// Wait for the submitted tasks with these options.
    pub wait: Option<WaitOptions>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            operation: LoaderOperation::Add,
            batch_size: None,
            primary_key: None,
            compress: false,
            custom_metadata: None,
            csv_delimiter: None,
            directory_format: DocumentFormat::Json,
            combine_documents: true,
            wait: None,
        }
    }
}

/// What a load submitted, and how it ended when waited on.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub document_count: usize,
    /// Task handles in submission order.
    pub tasks: Vec<TaskInfo>,
    /// Final task states, when the loader waits.
    pub results: Vec<TaskResult>,
}

impl LoadSummary {
    /// Number of waited-on tasks that did not succeed.
    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|t| t.status != TaskStatus::Succeeded)
            .count()
    }
}

/// Loader that submits documents to one index.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    index: Index,
    config: LoaderConfig,
}

impl DocumentLoader {
    /// Create a loader with the default configuration.
    pub fn new(index: Index) -> Self {
        Self::with_config(index, LoaderConfig::default())
    }

    /// Create a loader with a custom configuration.
    pub fn with_config(index: Index, config: LoaderConfig) -> Self {
        Self { index, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Submit documents.
    #[instrument(skip(self, documents), fields(index_uid = self.index.uid(), document_count = documents.len()))]
    pub async fn load(&self, documents: &[Document]) -> Result<LoadSummary, IngestError> {
        let tasks = self.submit(documents).await?;
        self.finish(documents.len(), tasks).await
    }

    /// Submit the documents produced by `producer`.
    pub async fn load_from<F>(&self, producer: F) -> Result<LoadSummary, IngestError>
    where
        F: Future<Output = Result<Vec<Document>, IngestError>>,
    {
        let documents = producer.await?;
        self.load(&documents).await
    }

    /// Submit the documents of a JSON, NDJSON or CSV file.
    #[instrument(skip(self), fields(index_uid = self.index.uid()))]
    pub async fn load_file(&self, path: &Path) -> Result<LoadSummary, IngestError> {
        let documents = self.read_file(path.to_path_buf()).await?;
        self.load(&documents).await
    }

    /// Submit every file of `config.directory_format` in a directory.
    ///
    /// Files are read in name order. With `combine_documents` all documents
    /// go out as one submission; otherwise each file is its own submission,
    /// the first one sent before the others start.
    #[instrument(skip(self), fields(index_uid = self.index.uid()))]
    pub async fn load_directory(&self, directory: &Path) -> Result<LoadSummary, IngestError> {
        let files = self.directory_files(directory).await?;

        let mut per_file = Vec::with_capacity(files.len());
        for path in files {
            per_file.push(self.read_file(path).await?);
        }
        let document_count = per_file.iter().map(Vec::len).sum();

        if self.config.combine_documents {
            let combined: Vec<Document> = per_file.into_iter().flatten().collect();
            let tasks = self.submit(&combined).await?;
            return self.finish(document_count, tasks).await;
        }

        let Some((first, rest)) = per_file.split_first() else {
            return self.finish(0, Vec::new()).await;
        };
        let mut tasks = self.submit(first).await?;
        let rest = self
            .index
            .executor()
            .join_all(rest.iter().map(|documents| self.submit(documents)))
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to submit directory files"))?;
        tasks.extend(rest.into_iter().flatten());

        self.finish(document_count, tasks).await
    }

    async fn directory_files(&self, directory: &Path) -> Result<Vec<PathBuf>, IngestError> {
        let extension = self.config.directory_format.extension();
        let mut entries = tokio::fs::read_dir(directory).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(IngestError::NoDocuments {
                format: extension.to_string(),
                directory: directory.display().to_string(),
            });
        }
        files.sort();
        debug!(count = files.len(), "Found document files");
        Ok(files)
    }

    async fn read_file(&self, path: PathBuf) -> Result<Vec<Document>, IngestError> {
        let delimiter = self.config.csv_delimiter;
        tokio::task::spawn_blocking(move || load_documents_from_file(&path, delimiter)).await?
    }

    async fn submit(&self, documents: &[Document]) -> Result<Vec<TaskInfo>, meili_client::MeiliError> {
        let primary_key = self.config.primary_key.as_deref();
        let update = self.config.operation == LoaderOperation::Update;

        match self.config.batch_size {
            Some(batch_size) => {
                let options = BatchOptions {
                    batch_size,
                    primary_key: self.config.primary_key.clone(),
                    compress: self.config.compress,
                    custom_metadata: self.config.custom_metadata.clone(),
                    ..BatchOptions::default()
                };
                if update {
                    self.index.update_documents_in_batches(documents, &options).await
                } else {
                    self.index.add_documents_in_batches(documents, &options).await
                }
            }
            None => {
                let options = DocumentOptions {
                    compress: self.config.compress,
                    custom_metadata: self.config.custom_metadata.clone(),
                };
                let task = if update {
                    self.index.update_documents(documents, primary_key, &options).await?
                } else {
                    self.index.add_documents(documents, primary_key, &options).await?
                };
                Ok(vec![task])
            }
        }
    }

    async fn finish(
        &self,
        document_count: usize,
        tasks: Vec<TaskInfo>,
    ) -> Result<LoadSummary, IngestError> {
        let results = match &self.config.wait {
            Some(wait) => self.index.wait_for_tasks(&tasks, wait).await?,
            None => Vec::new(),
        };

        let summary = LoadSummary {
            document_count,
            tasks,
            results,
        };
        info!(
            documents = summary.document_count,
            tasks = summary.tasks.len(),
            failed = summary.failed(),
            "Loaded documents"
        );
        Ok(summary)
    }
}
