//! Client implementation.
//!
//! This module provides the main entry point. The client owns the transport
//! (and with it the connection pool) and hands out [`Index`] handles that
//! share it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use crate::codec::BuiltinHandler;
use crate::config::ClientConfig;
use crate::errors::MeiliError;
use crate::executor::Executor;
use crate::http::{HttpRequests, ReqwestTransport};
use crate::index::{BatchOptions, Index};
use crate::interfaces::{JsonHandler, Transport};
use crate::plugins::IndexPlugins;
use crate::tasks::{TaskFilter, Tasks, WaitOptions};
use meili_shared::{TaskInfo, TaskList, TaskResult};

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

/// The main client for talking to the server.
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpRequests,
    config: ClientConfig,
    tasks: Tasks,
}

impl Client {
    /// Create a client for the server at `url`.
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, MeiliError> {
        let mut config = ClientConfig::new(url);
        config.api_key = api_key;
        Self::with_config(config)
    }

    /// Create a client with a custom configuration, using the reqwest transport.
    pub fn with_config(config: ClientConfig) -> Result<Self, MeiliError> {
        let transport = ReqwestTransport::with_proxy(
            &config.url,
            config.api_key.clone(),
            config.timeout,
            &config.proxy,
        )?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client on top of any transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let http = HttpRequests::new(transport, Arc::new(BuiltinHandler));
        info!(
            url = %config.url,
            mode = ?config.execution_mode,
            concurrency_limit = ?config.concurrency_limit,
            "Created client"
        );
        Self::from_parts(http, config)
    }

    /// Use another JSON codec for every request of this client.
    pub fn with_json_handler(self, json: Arc<dyn JsonHandler>) -> Self {
        let http = self.http.with_json_handler(json);
        Self::from_parts(http, self.config)
    }

    fn from_parts(http: HttpRequests, config: ClientConfig) -> Self {
        Self {
            tasks: Tasks::new(http.clone(), config.executor()),
            http,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn executor(&self) -> Executor {
        self.config.executor()
    }

    /// Batch options with the configured batch size.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions::default().with_batch_size(self.config.batch_size)
    }

    /// Handle on an index. No request is made.
    pub fn index(&self, uid: impl Into<String>) -> Index {
        self.index_with_plugins(uid, &IndexPlugins::new())
    }

    /// Handle on an index whose operations run through `plugins`.
    pub fn index_with_plugins(&self, uid: impl Into<String>, plugins: &IndexPlugins) -> Index {
        Index::new(uid, self.http.clone(), self.executor(), plugins)
    }

    #[instrument(skip(self))]
    pub async fn create_index(
        &self,
        uid: &str,
        primary_key: Option<&str>,
    ) -> Result<TaskInfo, MeiliError> {
        let body = json!({ "uid": uid, "primaryKey": primary_key });
        self.http.post("indexes", Some(&body), false).await
    }

    #[instrument(skip(self))]
    pub async fn delete_index(&self, uid: &str) -> Result<TaskInfo, MeiliError> {
        self.http.delete(&format!("indexes/{}", uid)).await
    }

    pub async fn health(&self) -> Result<Health, MeiliError> {
        self.http.get("health").await
    }

    /// Whether the server answers its health check.
    pub async fn is_healthy(&self) -> bool {
        self.health()
            .await
            .map(|h| h.status == "available")
            .unwrap_or(false)
    }

    pub fn tasks(&self) -> &Tasks {
        &self.tasks
    }

    pub async fn get_task(&self, task_uid: u64) -> Result<TaskResult, MeiliError> {
        self.tasks.get_task(task_uid).await
    }

    pub async fn get_tasks(&self, filter: &TaskFilter) -> Result<TaskList, MeiliError> {
        self.tasks.get_tasks(filter).await
    }

    pub async fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo, MeiliError> {
        self.tasks.cancel_tasks(filter).await
    }

    pub async fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo, MeiliError> {
        self.tasks.delete_tasks(filter).await
    }

    /// Wait for a task; `None` uses the configured wait options.
    pub async fn wait_for_task(
        &self,
        task_uid: u64,
        options: Option<&WaitOptions>,
    ) -> Result<TaskResult, MeiliError> {
        let options = options.unwrap_or(&self.config.wait);
        self.tasks.wait_for_task(task_uid, options).await
    }

    /// Wait for several tasks; `None` uses the configured wait options.
    pub async fn wait_for_tasks(
        &self,
        tasks: &[TaskInfo],
        options: Option<&WaitOptions>,
    ) -> Result<Vec<TaskResult>, MeiliError> {
        let options = options.unwrap_or(&self.config.wait);
        self.tasks.wait_for_tasks(tasks, options).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::Value;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ProxyMode;
    use crate::interfaces::HttpMethod;
    use crate::testing::{documents, init_tracing, task_info, task_result, MockTransport};
    use meili_shared::TaskStatus;

    /// serde_json codec that counts its calls.
    #[derive(Debug, Default)]
    struct CountingHandler {
        dumps: AtomicUsize,
        loads: AtomicUsize,
    }

    impl JsonHandler for CountingHandler {
        fn dumps(&self, value: &Value) -> Result<Vec<u8>, MeiliError> {
            self.dumps.fetch_add(1, Ordering::SeqCst);
            BuiltinHandler.dumps(value)
        }

        fn loads(&self, bytes: &[u8]) -> Result<Value, MeiliError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            BuiltinHandler.loads(bytes)
        }
    }

    fn client(transport: Arc<MockTransport>) -> Client {
        Client::with_transport(transport, ClientConfig::default())
    }

    #[tokio::test]
    async fn test_index_handles_share_transport() {
        let transport = Arc::new(MockTransport::with_task_uids());
        let client = client(transport.clone());

        client.index("movies").delete_all_documents().await.unwrap();
        client.index("books").delete_all_documents().await.unwrap();

        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["indexes/movies/documents", "indexes/books/documents"]);
    }

    #[tokio::test]
    async fn test_create_and_delete_index() {
        let transport = Arc::new(MockTransport::with_task_uids());
        let client = client(transport.clone());

        client.create_index("movies", Some("id")).await.unwrap();
        client.delete_index("movies").await.unwrap();

        let sent = transport.requests();
        assert_eq!((sent[0].method, sent[0].path.as_str()), (HttpMethod::Post, "indexes"));
        assert_eq!(
            transport.bodies()[0],
            serde_json::json!({"uid": "movies", "primaryKey": "id"})
        );
        assert_eq!(
            (sent[1].method, sent[1].path.as_str()),
            (HttpMethod::Delete, "indexes/movies")
        );
    }

    #[tokio::test]
    async fn test_unhealthy_when_unreachable() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(MeiliError::communication("connection refused"))
        }));
        assert!(!client(transport).is_healthy().await);
    }

    #[tokio::test]
    async fn test_swapped_codec_handles_batched_add() {
        let transport = Arc::new(MockTransport::with_task_uids());
        let codec = Arc::new(CountingHandler::default());
        let client = client(transport.clone()).with_json_handler(codec.clone());

        let tasks = client
            .index("movies")
            .add_documents_in_batches(&documents(25), &BatchOptions::default().with_batch_size(10))
            .await
            .unwrap();

        assert_eq!(
            tasks.iter().map(|t| t.task_uid).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(codec.dumps.load(Ordering::SeqCst), 3);
        assert_eq!(codec.loads.load(Ordering::SeqCst), 3);
        assert_eq!(
            transport
                .bodies()
                .iter()
                .map(|b| b.as_array().unwrap().len())
                .collect::<Vec<_>>(),
            vec![10, 10, 5]
        );
    }

    #[test]
    fn test_batch_options_follow_config() {
        let client = Client::with_transport(
            Arc::new(MockTransport::with_task_uids()),
            ClientConfig::default().with_batch_size(25),
        );
        assert_eq!(client.batch_options().batch_size, 25);
    }

    #[tokio::test]
    async fn test_add_and_wait_over_http() {
        init_tracing();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents"))
            .and(query_param("primaryKey", "id"))
            .and(header("authorization", "Bearer masterKey"))
            .and(body_json(Value::Array(
                documents(2).into_iter().map(Value::Object).collect(),
            )))
            .respond_with(ResponseTemplate::new(202).set_body_json(task_info(12)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_result(12, "succeeded")))
            .mount(&server)
            .await;

        let config = ClientConfig::new(server.uri())
            .with_proxy(ProxyMode::Disabled)
            .with_api_key("masterKey")
            .with_timeout(Duration::from_secs(5));
        let client = Client::with_config(config).unwrap();

        let task = client
            .index("movies")
            .add_documents(&documents(2), Some("id"), &Default::default())
            .await
            .unwrap();
        let result = client.wait_for_task(task.task_uid, None).await.unwrap();

        assert_eq!(result.status, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_from_index_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/search"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "Attribute `year` is not filterable.",
                "code": "invalid_search_filter",
                "type": "invalid_request",
                "link": "https://docs.meilisearch.com/errors#invalid_search_filter"
            })))
            .mount(&server)
            .await;

        let client =
            Client::with_config(ClientConfig::new(server.uri()).with_proxy(ProxyMode::Disabled))
                .unwrap();
        let err = client
            .index("movies")
            .search(&meili_shared::SearchQuery::new("carol").with_filter("year > 2000"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(400));
    }
}
