use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::MeiliError;
use crate::interfaces::{HttpMethod, HttpRequest, HttpResponse, JsonHandler, Transport};

/// Typed request helper shared by the client and its index handles.
///
/// Bodies are turned into a [`Value`] with serde and then encoded by the
/// configured [`JsonHandler`]; responses take the reverse path.
#[derive(Clone)]
pub struct HttpRequests {
    transport: Arc<dyn Transport>,
    json: Arc<dyn JsonHandler>,
}

impl std::fmt::Debug for HttpRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequests")
            .field("json", &self.json)
            .finish_non_exhaustive()
    }
}

impl HttpRequests {
    pub fn new(transport: Arc<dyn Transport>, json: Arc<dyn JsonHandler>) -> Self {
        Self { transport, json }
    }

    /// Replace the codec, keeping the transport.
    pub fn with_json_handler(&self, json: Arc<dyn JsonHandler>) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            json,
        }
    }

    pub fn json_handler(&self) -> &dyn JsonHandler {
        self.json.as_ref()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, MeiliError> {
        self.send_json::<(), T>(HttpMethod::Get, path, None, false)
            .await
    }

    pub async fn post<B, T>(
        &self,
        path: &str,
        body: Option<&B>,
        compress: bool,
    ) -> Result<T, MeiliError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(HttpMethod::Post, path, body, compress).await
    }

    pub async fn put<B, T>(&self, path: &str, body: Option<&B>, compress: bool) -> Result<T, MeiliError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(HttpMethod::Put, path, body, compress).await
    }

    pub async fn patch<B, T>(
        &self,
        path: &str,
        body: Option<&B>,
        compress: bool,
    ) -> Result<T, MeiliError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(HttpMethod::Patch, path, body, compress).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, MeiliError> {
        self.send_json::<(), T>(HttpMethod::Delete, path, None, false)
            .await
    }

    /// Send a prepared request as is.
    pub async fn send_raw(&self, request: HttpRequest) -> Result<HttpResponse, MeiliError> {
        self.transport.send(request).await
    }

    /// Encode a body with the configured codec.
    pub fn encode<B: Serialize + ?Sized>(&self, body: &B) -> Result<Vec<u8>, MeiliError> {
        let value = serde_json::to_value(body)?;
        self.json.dumps(&value)
    }

    /// Decode a response body with the configured codec.
    ///
    /// An empty body decodes as `null`.
    pub fn decode<T: DeserializeOwned>(&self, response: &HttpResponse) -> Result<T, MeiliError> {
        let value = if response.body.is_empty() {
            Value::Null
        } else {
            self.json.loads(&response.body)?
        };
        serde_json::from_value(value).map_err(|e| {
            MeiliError::serialization(format!("Unexpected response body: {}", e))
        })
    }

    async fn send_json<B, T>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        compress: bool,
    ) -> Result<T, MeiliError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = HttpRequest::new(method, path);
        if let Some(body) = body {
            request = request
                .with_body(self.encode(body)?, "application/json")
                .with_compression(compress);
        }
        let response = self.transport.send(request).await?;
        self.decode(&response)
    }
}
