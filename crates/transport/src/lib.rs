//! Outbound transport abstraction for the request gateway
//!
//! Defines the `Transport` trait that decouples the gateway's authorization
//! protocol from the HTTP client. `HttpTransport` is the reqwest-backed
//! implementation used in production; tests substitute scripted transports
//! implementing the same trait.

pub mod http;

pub use http::HttpTransport;

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A fully prepared outbound call: headers already carry credential and
/// tenant context, `path` is relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response as received from the remote side, regardless of status.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Failures where no HTTP response was obtained. These never carry a status
/// code; the gateway reports them as status 0.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Abstraction over the wire used to reach the remote API.
///
/// Non-2xx statuses are NOT errors at this layer: they come back as
/// `Ok(TransportResponse)` so the gateway can inspect 401s and feed the
/// body to the error classifier. `Err` is reserved for calls that never
/// produced a response.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_covers_2xx_only() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(401, "").is_success());
        assert!(!TransportResponse::new(0, "").is_success());
    }

    #[test]
    fn json_parses_body() {
        let response = TransportResponse::new(200, r#"{"id":"job-1","total":3}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], "job-1");
        assert_eq!(value["total"], 3);
    }

    #[test]
    fn outbound_request_builder_sets_body() {
        let request = OutboundRequest::new(Method::POST, "/jobs")
            .with_body(serde_json::json!({"title": "Fix sink"}));
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/jobs");
        assert_eq!(request.body.unwrap()["title"], "Fix sink");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn transport_error_messages() {
        assert_eq!(
            TransportError::Timeout(Duration::from_secs(30)).to_string(),
            "request timed out after 30s"
        );
        assert!(
            TransportError::Connect("refused".into())
                .to_string()
                .contains("refused")
        );
    }
}
