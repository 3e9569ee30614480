//! Structured error returned by the server.
//!
//! Non-success responses carry a JSON body describing the failure. This module
//! decodes that body into an [`ApiError`].

use std::fmt;

use serde::Deserialize;

/// Error sent by the server for a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code of the response.
    pub status_code: u16,
    /// Server error code, e.g. `index_not_found`.
    pub code: Option<String>,
    /// Human readable message.
    pub message: String,
    /// Error category, e.g. `invalid_request`.
    pub error_type: Option<String>,
    /// Link to the error documentation.
    pub link: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

impl ApiError {
    /// Build an error from a status code and the raw response body.
    ///
    /// When the body is not the server's JSON error shape, the raw text (or the
    /// canonical reason of the status) becomes the message.
    pub fn from_response(status_code: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => Self {
                status_code,
                code: parsed.code,
                message: parsed.message.unwrap_or_default(),
                error_type: parsed.error_type,
                link: parsed.link,
            },
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                let message = if text.is_empty() {
                    reqwest::StatusCode::from_u16(status_code)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    text
                };
                Self {
                    status_code,
                    code: None,
                    message,
                    error_type: None,
                    link: None,
                }
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API error ({})", self.status_code)?;
        if let Some(code) = &self.code {
            write!(f, " {}", code)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(link) = &self.link {
            write!(f, " (see {})", link)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_body() {
        let body = br#"{
            "message": "Index `movies` not found.",
            "code": "index_not_found",
            "type": "invalid_request",
            "link": "https://docs.meilisearch.com/errors#index_not_found"
        }"#;

        let error = ApiError::from_response(404, body);

        assert_eq!(error.status_code, 404);
        assert_eq!(error.code.as_deref(), Some("index_not_found"));
        assert_eq!(error.message, "Index `movies` not found.");
        assert_eq!(error.error_type.as_deref(), Some("invalid_request"));
        assert!(error.to_string().contains("index_not_found"));
    }

    #[test]
    fn test_from_plain_text_body() {
        let error = ApiError::from_response(502, b"bad gateway");
        assert_eq!(error.message, "bad gateway");
        assert!(error.code.is_none());
    }

    #[test]
    fn test_from_empty_body_uses_reason() {
        let error = ApiError::from_response(503, b"");
        assert_eq!(error.message, "Service Unavailable");
    }
}
