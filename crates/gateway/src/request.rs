//! Caller-facing request description

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use transport::OutboundRequest;

use crate::endpoints::EndpointPolicy;

/// One outbound call as the application describes it, before the gateway
/// attaches credential and tenant context.
///
/// Whether the endpoint is public or tenant-exempt comes from the gateway's
/// `EndpointPolicy` unless forced with `public()` / `skip_tenant()`.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    public: Option<bool>,
    tenant_exempt: Option<bool>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            public: None,
            tenant_exempt: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Send without a credential and never enter the refresh path.
    pub fn public(mut self) -> Self {
        self.public = Some(true);
        self
    }

    /// Send without tenant headers.
    pub fn skip_tenant(mut self) -> Self {
        self.tenant_exempt = Some(true);
        self
    }

    pub fn is_public(&self, policy: &EndpointPolicy) -> bool {
        self.public.unwrap_or_else(|| policy.is_public(&self.path))
    }

    pub fn is_tenant_exempt(&self, policy: &EndpointPolicy) -> bool {
        self.tenant_exempt
            .unwrap_or_else(|| policy.is_tenant_exempt(&self.path))
    }

    pub(crate) fn into_outbound(self) -> OutboundRequest {
        OutboundRequest {
            method: self.method,
            path: self.path,
            headers: self.headers,
            body: self.body,
        }
    }
}
