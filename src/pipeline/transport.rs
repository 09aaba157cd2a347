//! HTTP transport: the only place that talks to the network.
//!
//! The job client never touches `reqwest` directly. It goes through the
//! object-safe [`Transport`] trait so the whole orchestration (polling, retry
//! budget, concurrency limit, collation) can be driven by a scripted
//! in-memory server in tests, or by a caller-supplied client with custom
//! middleware in production.
//!
//! A transport reports *every* HTTP response as `Ok(HttpResponse)`, whatever
//! its status code. Deciding which status codes are fatal, retryable or fine
//! is the job client's business.

use crate::error::DocServeError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Status code and raw body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Convenience constructor serialising `value` as the body.
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as `T`, mapping any mismatch to [`DocServeError::Protocol`].
    pub fn parse<T: DeserializeOwned>(&self, url: &str) -> Result<T, DocServeError> {
        serde_json::from_slice(&self.body).map_err(|e| DocServeError::Protocol {
            url: url.to_string(),
            detail: format!("HTTP {}: {}", self.status, e),
        })
    }
}

/// Issues the two kinds of request the job protocol needs.
///
/// Implementations must be `Send + Sync`: a single transport is shared by
/// every concurrent pipeline of a batch.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `url`.
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, DocServeError>;

    /// GET `url`.
    async fn get(&self, url: &str) -> Result<HttpResponse, DocServeError>;
}

/// Default [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Build a client sending `headers` with every request.
    pub fn new(headers: &BTreeMap<String, String>, timeout_secs: u64) -> Result<Self, DocServeError> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                DocServeError::InvalidConfig(format!("Invalid header name '{name}': {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                DocServeError::InvalidConfig(format!("Invalid value for header '{name}': {e}"))
            })?;
            default_headers.insert(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DocServeError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> DocServeError {
        if e.is_timeout() {
            DocServeError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            DocServeError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    async fn read(&self, url: &str, response: reqwest::Response) -> Result<HttpResponse, DocServeError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(url, e))?;
        debug!("{} → HTTP {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, DocServeError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;
        self.read(url, response).await
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, DocServeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;
        self.read(url, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn parse_maps_bad_json_to_protocol_error() {
        let resp = HttpResponse::new(200, "<html>bad gateway</html>");
        let err = resp.parse::<Value>("http://x/status").unwrap_err();
        assert!(matches!(err, DocServeError::Protocol { .. }));
        assert!(err.to_string().contains("http://x/status"));
    }

    #[test]
    fn json_constructor_round_trips_body() {
        let resp = HttpResponse::json(200, &json!({"task_id": "t1"}));
        let v: Value = resp.parse("u").unwrap();
        assert_eq!(v["task_id"], "t1");
    }

    #[test]
    fn rejects_invalid_header_name() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "v".to_string());
        let err = HttpTransport::new(&headers, 10).unwrap_err();
        assert!(matches!(err, DocServeError::InvalidConfig(_)));
    }

    #[test]
    fn accepts_valid_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Api-Key".to_string(), "abc".to_string());
        assert!(HttpTransport::new(&headers, 10).is_ok());
    }
}
