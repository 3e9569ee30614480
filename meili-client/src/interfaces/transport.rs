//! Transport trait definition.
//!
//! This module defines the abstract interface for sending a request to the
//! server, allowing the reqwest implementation to be replaced by a mock in
//! tests or by another HTTP stack.

use async_trait::async_trait;

use crate::errors::MeiliError;

/// HTTP methods used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Path relative to the server's base URL, including any query string.
    pub path: String,
    /// Encoded body, if any.
    pub body: Option<Vec<u8>>,
    pub content_type: String,
    /// Send the body gzip-compressed.
    pub compress: bool,
    /// Extra headers on top of the transport defaults.
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Create a request without a body.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            content_type: "application/json".to_string(),
            compress: false,
            headers: Vec::new(),
        }
    }

    /// Attach an encoded body.
    pub fn with_body(mut self, body: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = Some(body);
        self.content_type = content_type.into();
        self
    }

    /// Toggle gzip compression of the body.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Look up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Abstract interface for sending requests to the server.
///
/// # Error Handling
///
/// Implementations must return [`MeiliError::CommunicationError`] when the
/// server could not be reached and [`MeiliError::ApiError`] for non-2xx
/// responses. Nothing is retried.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; one transport is shared by every
/// index handle of a client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MeiliError>;
}
