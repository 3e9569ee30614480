//! Pre / concurrent / post execution around one request.

use std::future::Future;

use tracing::{debug, warn};

use super::registry::{OperationKind, PhasedPlugins, PluginRegistration};
use crate::errors::MeiliError;
use crate::executor::Executor;
use crate::interfaces::{PluginEvent, PluginOutcome, PluginPayload};
use meili_shared::Document;

/// Runs the plugins of one operation around its request.
///
/// 1. Pre plugins run one after the other before the request. The last
///    non-empty document transform replaces the documents to send.
/// 2. The request and the concurrent plugins are joined. A request error
///    wins, then the first plugin error in registration order, then the last
///    non-empty result of the same kind replaces the outcome.
/// 3. Post plugins run one after the other, each given the same outcome. The
///    last non-empty replacement is returned.
///
/// Any plugin error aborts the operation.
#[derive(Debug, Clone, Copy)]
pub struct PluginPipeline<'a> {
    kind: OperationKind,
    plugins: &'a PhasedPlugins,
    executor: Executor,
}

impl<'a> PluginPipeline<'a> {
    pub fn new(kind: OperationKind, plugins: &'a PhasedPlugins, executor: Executor) -> Self {
        Self {
            kind,
            plugins,
            executor,
        }
    }

    /// Run all three phases around `call`.
    ///
    /// Document submissions must go through [`pre`](Self::pre) and
    /// [`execute`](Self::execute) so a transformed document list reaches the
    /// request; a `Documents` payload is rejected here before anything runs.
    pub async fn run<F>(
        &self,
        payload: PluginPayload<'_>,
        call: F,
    ) -> Result<PluginOutcome, MeiliError>
    where
        F: Future<Output = Result<PluginOutcome, MeiliError>>,
    {
        if let PluginPayload::Documents { .. } = payload {
            return Err(MeiliError::validation(format!(
                "{} plugins must run through pre and execute for document payloads",
                self.kind.as_str()
            )));
        }
        self.pre(payload).await?;
        self.execute(payload, call).await
    }

    /// Pre phase. Returns the replacement documents, if any plugin proposed one.
    pub async fn pre(
        &self,
        payload: PluginPayload<'_>,
    ) -> Result<Option<Vec<Document>>, MeiliError> {
        let mut replacement = None;

        for registration in &self.plugins.pre {
            self.trace(PluginEvent::Pre, registration);
            let capabilities = registration.capabilities();
            let plugin = registration.plugin();

            if capabilities.generic {
                plugin
                    .run_plugin(PluginEvent::Pre, payload)
                    .await
                    .map_err(|e| self.fault(PluginEvent::Pre, registration, e))?;
            }

            if capabilities.document_transform {
                if let PluginPayload::Documents {
                    documents,
                    primary_key,
                } = payload
                {
                    let transformed = plugin
                        .run_document_plugin(PluginEvent::Pre, documents, primary_key)
                        .await
                        .map_err(|e| self.fault(PluginEvent::Pre, registration, e))?;
                    if transformed.is_some() {
                        replacement = transformed;
                    }
                }
            }
        }

        Ok(replacement)
    }

    /// Concurrent and post phases around `call`.
    pub async fn execute<F>(
        &self,
        payload: PluginPayload<'_>,
        call: F,
    ) -> Result<PluginOutcome, MeiliError>
    where
        F: Future<Output = Result<PluginOutcome, MeiliError>>,
    {
        let outcome = if self.plugins.concurrent.is_empty() {
            call.await?
        } else {
            self.concurrent(payload, call).await?
        };
        self.post(outcome).await
    }

    async fn concurrent<F>(
        &self,
        payload: PluginPayload<'_>,
        call: F,
    ) -> Result<PluginOutcome, MeiliError>
    where
        F: Future<Output = Result<PluginOutcome, MeiliError>>,
    {
        // Plugins are not bounded by the batch limit.
        let plugin_executor = Executor::new(self.executor.mode(), None);
        let plugins = plugin_executor.join_all(
            self.plugins
                .concurrent
                .iter()
                .map(|registration| async move {
                    Ok::<_, MeiliError>(self.run_concurrent(registration, payload).await)
                }),
        );

        let (outcome, plugin_results) = self.executor.join_pair(call, plugins).await;
        let mut outcome = outcome?;
        let plugin_results = plugin_results?;

        let mut replacement = None;
        for (registration, result) in self.plugins.concurrent.iter().zip(plugin_results) {
            match result {
                Err(e) => return Err(self.fault(PluginEvent::Concurrent, registration, e)),
                Ok(Some(proposed)) if proposed.same_kind(&outcome) => replacement = Some(proposed),
                Ok(_) => {}
            }
        }
        if let Some(proposed) = replacement {
            outcome = proposed;
        }
        Ok(outcome)
    }

    async fn run_concurrent(
        &self,
        registration: &PluginRegistration,
        payload: PluginPayload<'_>,
    ) -> Result<Option<PluginOutcome>, MeiliError> {
        self.trace(PluginEvent::Concurrent, registration);
        let capabilities = registration.capabilities();
        let plugin = registration.plugin();

        if capabilities.document_transform {
            if let PluginPayload::Documents {
                documents,
                primary_key,
            } = payload
            {
                plugin
                    .run_document_plugin(PluginEvent::Concurrent, documents, primary_key)
                    .await?;
            }
        }

        if capabilities.generic {
            plugin.run_plugin(PluginEvent::Concurrent, payload).await
        } else {
            Ok(None)
        }
    }

    async fn post(&self, outcome: PluginOutcome) -> Result<PluginOutcome, MeiliError> {
        let mut replacement = None;

        for registration in &self.plugins.post {
            self.trace(PluginEvent::Post, registration);
            let capabilities = registration.capabilities();
            let plugin = registration.plugin();

            if capabilities.generic {
                let proposed = plugin
                    .run_plugin(PluginEvent::Post, PluginPayload::Outcome(&outcome))
                    .await
                    .map_err(|e| self.fault(PluginEvent::Post, registration, e))?;
                if let Some(proposed) = proposed.filter(|p| p.same_kind(&outcome)) {
                    replacement = Some(proposed);
                }
            }

            if capabilities.search_transform {
                if let PluginOutcome::Search(results) = &outcome {
                    let proposed = plugin
                        .run_post_search_plugin(PluginEvent::Post, results)
                        .await
                        .map_err(|e| self.fault(PluginEvent::Post, registration, e))?;
                    if let Some(proposed) = proposed {
                        replacement = Some(PluginOutcome::Search(proposed));
                    }
                }
            }
        }

        Ok(replacement.unwrap_or(outcome))
    }

    fn trace(&self, event: PluginEvent, registration: &PluginRegistration) {
        debug!(
            operation = self.kind.as_str(),
            event = ?event,
            plugin = registration.name(),
            "Running plugin"
        );
    }

    fn fault(
        &self,
        event: PluginEvent,
        registration: &PluginRegistration,
        error: MeiliError,
    ) -> MeiliError {
        warn!(
            operation = self.kind.as_str(),
            event = ?event,
            plugin = registration.name(),
            error = %error,
            "Plugin failed"
        );
        error
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::interfaces::IndexPlugin;
    use crate::plugins::{IndexPlugins, PluginRegistration, PluginTable};
    use crate::testing::{documents, task_info};
    use meili_shared::{SearchResults, TaskInfo};

    /// Global sequence shared by the plugins and the request of one test.
    #[derive(Default)]
    struct Sequence {
        next: AtomicUsize,
        log: Mutex<Vec<(String, usize)>>,
    }

    impl Sequence {
        fn record(&self, label: impl Into<String>) -> usize {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push((label.into(), n));
            n
        }

        fn at(&self, label: &str) -> usize {
            self.log
                .lock()
                .unwrap()
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, n)| *n)
                .unwrap()
        }
    }

    struct Recorder {
        name: &'static str,
        sequence: Arc<Sequence>,
        seen: Mutex<Vec<PluginOutcome>>,
        reply: Option<PluginOutcome>,
        fail: bool,
    }

    impl Recorder {
        fn new(name: &'static str, sequence: &Arc<Sequence>) -> Self {
            Self {
                name,
                sequence: sequence.clone(),
                seen: Mutex::new(Vec::new()),
                reply: None,
                fail: false,
            }
        }

        fn replying(mut self, reply: PluginOutcome) -> Self {
            self.reply = Some(reply);
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl IndexPlugin for Recorder {
        async fn run_plugin(
            &self,
            event: PluginEvent,
            payload: PluginPayload<'_>,
        ) -> Result<Option<PluginOutcome>, MeiliError> {
            if let PluginPayload::Outcome(outcome) = payload {
                self.seen.lock().unwrap().push(outcome.clone());
            }
            tokio::task::yield_now().await;
            self.sequence.record(format!("{}:{:?}", self.name, event));
            if self.fail {
                return Err(MeiliError::plugin(self.name, "boom"));
            }
            Ok(self.reply.clone())
        }
    }

    fn task(uid: u64) -> PluginOutcome {
        PluginOutcome::Task(serde_json::from_value::<TaskInfo>(task_info(uid)).unwrap())
    }

    fn search(query: &str) -> PluginOutcome {
        PluginOutcome::Search(SearchResults {
            hits: Vec::new(),
            offset: None,
            limit: None,
            estimated_total_hits: None,
            hits_per_page: None,
            page: None,
            total_pages: None,
            total_hits: None,
            processing_time_ms: 1,
            query: query.to_string(),
            facet_distribution: None,
        })
    }

    fn table(kind: OperationKind, registrations: Vec<PluginRegistration>) -> PluginTable {
        let plugins = registrations
            .into_iter()
            .fold(IndexPlugins::new(), |plugins, r| plugins.register(kind, r));
        PluginTable::classify(&plugins)
    }

    async fn call(sequence: Arc<Sequence>, uid: u64) -> Result<PluginOutcome, MeiliError> {
        tokio::task::yield_now().await;
        sequence.record("call");
        Ok(task(uid))
    }

    #[tokio::test]
    async fn test_phase_ordering() {
        let sequence = Arc::new(Sequence::default());
        let pre = Arc::new(Recorder::new("pre", &sequence));
        let concurrent = Arc::new(Recorder::new("concurrent", &sequence));
        let post = Arc::new(Recorder::new("post", &sequence));
        let table = table(
            OperationKind::DeleteAllDocuments,
            vec![
                PluginRegistration::new("pre", pre).runs_before(),
                PluginRegistration::new("concurrent", concurrent),
                PluginRegistration::new("post", post.clone()).runs_after(),
            ],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::DeleteAllDocuments,
            table.get(OperationKind::DeleteAllDocuments),
            Executor::default(),
        );

        let outcome = pipeline
            .run(PluginPayload::AllDocuments, call(sequence.clone(), 9))
            .await
            .unwrap();

        assert_eq!(outcome, task(9));
        assert!(sequence.at("pre:Pre") < sequence.at("call"));
        assert!(sequence.at("call") < sequence.at("post:Post"));
        assert!(sequence.at("call") < sequence.at("concurrent:Concurrent"));
        assert!(sequence.at("concurrent:Concurrent") < sequence.at("post:Post"));
        // Post plugins see the raw result of the request.
        assert_eq!(*post.seen.lock().unwrap(), vec![task(9)]);
    }

    #[tokio::test]
    async fn test_sequential_mode_finishes_call_before_concurrent_plugins() {
        let sequence = Arc::new(Sequence::default());
        let concurrent = Arc::new(Recorder::new("side", &sequence));
        let table = table(
            OperationKind::DeleteDocument,
            vec![PluginRegistration::new("side", concurrent)],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::DeleteDocument,
            table.get(OperationKind::DeleteDocument),
            Executor::sequential(),
        );

        pipeline
            .run(PluginPayload::DocumentId("1"), call(sequence.clone(), 1))
            .await
            .unwrap();

        assert!(sequence.at("call") < sequence.at("side:Concurrent"));
    }

    #[tokio::test]
    async fn test_last_post_replacement_wins() {
        let sequence = Arc::new(Sequence::default());
        let first = Arc::new(Recorder::new("first", &sequence).replying(task(100)));
        let second = Arc::new(Recorder::new("second", &sequence).replying(task(200)));
        let silent = Arc::new(Recorder::new("silent", &sequence));
        let table = table(
            OperationKind::DeleteDocuments,
            vec![
                PluginRegistration::new("first", first.clone()).runs_after(),
                PluginRegistration::new("second", second.clone()).runs_after(),
                PluginRegistration::new("silent", silent).runs_after(),
            ],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::DeleteDocuments,
            table.get(OperationKind::DeleteDocuments),
            Executor::default(),
        );

        let ids = vec!["1".to_string()];
        let outcome = pipeline
            .run(PluginPayload::DocumentIds(&ids), call(sequence, 1))
            .await
            .unwrap();

        assert_eq!(outcome, task(200));
        // Both post plugins saw the request's result, not each other's.
        assert_eq!(*first.seen.lock().unwrap(), vec![task(1)]);
        assert_eq!(*second.seen.lock().unwrap(), vec![task(1)]);
    }

    #[tokio::test]
    async fn test_replacement_of_another_kind_is_ignored() {
        let sequence = Arc::new(Sequence::default());
        let wrong = Arc::new(Recorder::new("wrong", &sequence).replying(search("nope")));
        let table = table(
            OperationKind::DeleteAllDocuments,
            vec![
                PluginRegistration::new("wrong-concurrent", wrong.clone()),
                PluginRegistration::new("wrong-post", wrong).runs_after(),
            ],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::DeleteAllDocuments,
            table.get(OperationKind::DeleteAllDocuments),
            Executor::default(),
        );

        let outcome = pipeline
            .run(PluginPayload::AllDocuments, call(sequence, 3))
            .await
            .unwrap();

        assert_eq!(outcome, task(3));
    }

    #[tokio::test]
    async fn test_concurrent_replacement() {
        let sequence = Arc::new(Sequence::default());
        let replacer = Arc::new(Recorder::new("replacer", &sequence).replying(task(42)));
        let table = table(
            OperationKind::DeleteAllDocuments,
            vec![PluginRegistration::new("replacer", replacer)],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::DeleteAllDocuments,
            table.get(OperationKind::DeleteAllDocuments),
            Executor::default(),
        );

        let outcome = pipeline
            .run(PluginPayload::AllDocuments, call(sequence, 3))
            .await
            .unwrap();

        assert_eq!(outcome, task(42));
    }

    #[tokio::test]
    async fn test_concurrent_fault_is_surfaced_after_join() {
        let sequence = Arc::new(Sequence::default());
        let ok = Arc::new(Recorder::new("ok", &sequence));
        let broken = Arc::new(Recorder::new("broken", &sequence).failing());
        let also_broken = Arc::new(Recorder::new("also-broken", &sequence).failing());
        let table = table(
            OperationKind::DeleteAllDocuments,
            vec![
                PluginRegistration::new("ok", ok),
                PluginRegistration::new("broken", broken),
                PluginRegistration::new("also-broken", also_broken),
            ],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::DeleteAllDocuments,
            table.get(OperationKind::DeleteAllDocuments),
            Executor::default(),
        );

        let err = pipeline
            .run(PluginPayload::AllDocuments, call(sequence.clone(), 1))
            .await
            .unwrap_err();

        assert!(matches!(err, MeiliError::PluginError { name, .. } if name == "broken"));
        // The request and every plugin still ran to completion.
        assert_eq!(sequence.log.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_call_error_wins_over_plugin_error() {
        let sequence = Arc::new(Sequence::default());
        let broken = Arc::new(Recorder::new("broken", &sequence).failing());
        let table = table(
            OperationKind::DeleteAllDocuments,
            vec![PluginRegistration::new("broken", broken)],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::DeleteAllDocuments,
            table.get(OperationKind::DeleteAllDocuments),
            Executor::default(),
        );

        let err = pipeline
            .run(PluginPayload::AllDocuments, async {
                Err(MeiliError::communication("down"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MeiliError::CommunicationError(_)));
    }

    #[tokio::test]
    async fn test_pre_fault_aborts_before_call() {
        let sequence = Arc::new(Sequence::default());
        let broken = Arc::new(Recorder::new("validator", &sequence).failing());
        let table = table(
            OperationKind::DeleteAllDocuments,
            vec![PluginRegistration::new("validator", broken).runs_before()],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::DeleteAllDocuments,
            table.get(OperationKind::DeleteAllDocuments),
            Executor::default(),
        );
        let called = AtomicUsize::new(0);

        let err = pipeline
            .run(PluginPayload::AllDocuments, async {
                called.fetch_add(1, Ordering::SeqCst);
                Ok(task(1))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MeiliError::PluginError { .. }));
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    struct Redactor {
        tag: &'static str,
        generic_calls: AtomicUsize,
    }

    #[async_trait]
    impl IndexPlugin for Redactor {
        async fn run_plugin(
            &self,
            _event: PluginEvent,
            _payload: PluginPayload<'_>,
        ) -> Result<Option<PluginOutcome>, MeiliError> {
            self.generic_calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn run_document_plugin(
            &self,
            _event: PluginEvent,
            documents: &[Document],
            _primary_key: Option<&str>,
        ) -> Result<Option<Vec<Document>>, MeiliError> {
            Ok(Some(
                documents
                    .iter()
                    .cloned()
                    .map(|mut doc| {
                        doc.insert("tag".to_string(), json!(self.tag));
                        doc
                    })
                    .collect(),
            ))
        }
    }

    #[tokio::test]
    async fn test_last_document_transform_wins_and_capabilities_gate_hooks() {
        let first = Arc::new(Redactor {
            tag: "first",
            generic_calls: AtomicUsize::new(0),
        });
        let second = Arc::new(Redactor {
            tag: "second",
            generic_calls: AtomicUsize::new(0),
        });
        let table = table(
            OperationKind::AddDocuments,
            vec![
                PluginRegistration::new("first", first.clone())
                    .document_transform()
                    .runs_before(),
                PluginRegistration::new("second", second.clone())
                    .document_transform()
                    .without_generic()
                    .runs_before(),
            ],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::AddDocuments,
            table.get(OperationKind::AddDocuments),
            Executor::default(),
        );
        let docs = documents(2);

        let replaced = pipeline
            .pre(PluginPayload::Documents {
                documents: &docs,
                primary_key: Some("id"),
            })
            .await
            .unwrap()
            .unwrap();

        assert!(replaced.iter().all(|d| d["tag"] == json!("second")));
        assert_eq!(first.generic_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.generic_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_rejects_document_payloads() {
        let first = Arc::new(Redactor {
            tag: "first",
            generic_calls: AtomicUsize::new(0),
        });
        let table = table(
            OperationKind::AddDocuments,
            vec![PluginRegistration::new("first", first.clone())
                .document_transform()
                .runs_before()],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::AddDocuments,
            table.get(OperationKind::AddDocuments),
            Executor::default(),
        );
        let docs = documents(1);
        let called = AtomicUsize::new(0);

        let err = pipeline
            .run(
                PluginPayload::Documents {
                    documents: &docs,
                    primary_key: None,
                },
                async {
                    called.fetch_add(1, Ordering::SeqCst);
                    Ok(task(1))
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, MeiliError::ValidationError(_)));
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert_eq!(first.generic_calls.load(Ordering::SeqCst), 0);
    }

    struct Reranker;

    #[async_trait]
    impl IndexPlugin for Reranker {
        async fn run_post_search_plugin(
            &self,
            _event: PluginEvent,
            results: &SearchResults,
        ) -> Result<Option<SearchResults>, MeiliError> {
            let mut results = results.clone();
            results.query = format!("{} (reranked)", results.query);
            Ok(Some(results))
        }
    }

    #[tokio::test]
    async fn test_search_transform_in_post_phase() {
        let table = table(
            OperationKind::Search,
            vec![PluginRegistration::new("rerank", Arc::new(Reranker))
                .search_transform()
                .runs_after()],
        );
        let pipeline = PluginPipeline::new(
            OperationKind::Search,
            table.get(OperationKind::Search),
            Executor::default(),
        );
        let query = meili_shared::SearchQuery::new("carol");

        let outcome = pipeline
            .run(PluginPayload::Search(&query), async { Ok(search("carol")) })
            .await
            .unwrap();

        assert_eq!(outcome, search("carol (reranked)"));
    }
}
