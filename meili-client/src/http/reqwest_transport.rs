//! reqwest transport implementation.
//!
//! This module provides the concrete implementation of [`Transport`] using
//! reqwest. It owns the connection pool shared by every index handle of a
//! client.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, Proxy};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ProxyMode;
use crate::errors::{ApiError, MeiliError};
use crate::interfaces::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// User agent sent with every request.
pub fn user_agent() -> String {
    format!("Meilisearch Rust Client (v{})", env!("CARGO_PKG_VERSION"))
}

/// Transport backed by a reqwest client.
///
/// # Example
///
/// ```ignore
/// let transport = ReqwestTransport::new("http://localhost:7700", Some("masterKey".into()), None)?;
/// let response = transport.send(HttpRequest::new(HttpMethod::Get, "health")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    base_url: Url,
    api_key: Option<String>,
}

impl ReqwestTransport {
    /// Create a transport for the server at `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - The server URL (e.g., "http://localhost:7700")
    /// * `api_key` - Sent as a bearer token when present
    /// * `timeout` - Per-request timeout; `None` disables it
    ///
    /// # Returns
    ///
    /// * `Ok(ReqwestTransport)` - A new transport
    /// * `Err(MeiliError)` - If the URL is invalid or the client cannot be built
    pub fn new(
        url: &str,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, MeiliError> {
        Self::with_proxy(url, api_key, timeout, &ProxyMode::Environment)
    }

    /// Create a transport whose requests go through `proxy`.
    pub fn with_proxy(
        url: &str,
        api_key: Option<String>,
        timeout: Option<Duration>,
        proxy: &ProxyMode,
    ) -> Result<Self, MeiliError> {
        let mut base_url = Url::parse(url)
            .map_err(|e| MeiliError::validation(format!("Invalid server URL {}: {}", url, e)))?;

        // Url::join drops the last path segment unless it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = ReqwestClient::builder().user_agent(user_agent());
        builder = match proxy {
            ProxyMode::Environment => builder,
            ProxyMode::Disabled => builder.no_proxy(),
            ProxyMode::Url(proxy_url) => builder.proxy(Proxy::all(proxy_url.as_str()).map_err(
                |e| MeiliError::validation(format!("Invalid proxy URL {}: {}", proxy_url, e)),
            )?),
        };
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| MeiliError::communication(e.to_string()))?;

        info!(url = %base_url, authenticated = api_key.is_some(), proxy = ?proxy, "Created HTTP transport");

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Gzip-compress a request body.
fn gzip(body: &[u8]) -> Result<Vec<u8>, MeiliError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(body)
        .map_err(|e| MeiliError::serialization(format!("Gzip compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| MeiliError::serialization(format!("Gzip finalization failed: {}", e)))
}

fn map_send_error(err: reqwest::Error) -> MeiliError {
    if err.is_builder() {
        MeiliError::validation(err.to_string())
    } else {
        MeiliError::communication(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MeiliError> {
        let url = self.base_url.join(&request.path).map_err(|e| {
            MeiliError::validation(format!("Invalid request path {}: {}", request.path, e))
        })?;

        let mut builder = self
            .client
            .request(Self::method(request.method), url.clone());

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            let body = if request.compress {
                builder = builder.header(CONTENT_ENCODING, "gzip");
                gzip(&body)?
            } else {
                body
            };
            builder = builder
                .header(CONTENT_TYPE, request.content_type.as_str())
                .body(body);
        }

        debug!(method = request.method.as_str(), url = %url, "Sending request");

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| MeiliError::communication(e.to_string()))?
            .to_vec();

        if !status.is_success() {
            let error = ApiError::from_response(status.as_u16(), &body);
            warn!(
                status = %status,
                code = ?error.code,
                method = request.method.as_str(),
                url = %url,
                "Request rejected by server"
            );
            return Err(MeiliError::ApiError(error));
        }

        debug!(status = %status, bytes = body.len(), "Received response");

        Ok(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}
