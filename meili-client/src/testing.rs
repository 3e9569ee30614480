//! In-memory transport used by the unit tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::MeiliError;
use crate::interfaces::{HttpMethod, HttpRequest, HttpResponse, Transport};

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, MeiliError> + Send + Sync>;

/// Records every request and answers through a handler.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, MeiliError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            latency: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answers mutating requests with task stubs numbered from 1 in the order
    /// the requests are sent, and task lookups with a succeeded task.
    pub fn with_task_uids() -> Self {
        let next_uid = AtomicU64::new(1);
        Self::new(move |request| match request.method {
            HttpMethod::Get if request.path.starts_with("tasks/") => {
                let uid: u64 = request.path["tasks/".len()..].parse().unwrap_or(0);
                Ok(json_response(200, task_result(uid, "succeeded")))
            }
            HttpMethod::Get => Ok(json_response(200, json!({}))),
            _ => {
                let uid = next_uid.fetch_add(1, Ordering::SeqCst);
                Ok(json_response(202, task_info(uid)))
            }
        })
    }

    /// Keep each request in flight for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Decoded bodies of the requests sent so far.
    pub fn bodies(&self) -> Vec<Value> {
        self.requests()
            .iter()
            .filter_map(|r| r.body.as_deref())
            .map(|b| serde_json::from_slice(b).unwrap())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MeiliError> {
        // Answer before the first await so ids follow the order of polling.
        self.requests.lock().unwrap().push(request.clone());
        let response = (self.handler)(&request);

        if let Some(latency) = self.latency {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        response
    }
}

pub fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, serde_json::to_vec(&body).unwrap())
}

pub fn task_info(uid: u64) -> Value {
    json!({
        "taskUid": uid,
        "indexUid": "movies",
        "status": "enqueued",
        "type": "documentAdditionOrUpdate",
        "enqueuedAt": "2024-01-01T00:00:00Z"
    })
}

pub fn task_result(uid: u64, status: &str) -> Value {
    json!({
        "uid": uid,
        "indexUid": "movies",
        "status": status,
        "type": "documentAdditionOrUpdate",
        "enqueuedAt": "2024-01-01T00:00:00Z"
    })
}

pub fn documents(count: usize) -> Vec<meili_shared::Document> {
    (0..count)
        .filter_map(|i| meili_shared::document::from_value(json!({"id": i, "title": format!("Movie {i}")})))
        .collect()
}

/// Route library logs to the test output, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
