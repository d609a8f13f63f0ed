//! Scripted in-memory API for coordinator and gateway tests.
//!
//! Protected paths accept exactly one bearer token (`valid_access`); a
//! successful refresh makes the newly issued token the accepted one.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use session::REFRESH_PATH;
use tokio::sync::Semaphore;
use transport::{OutboundRequest, Transport, TransportError, TransportResponse};

#[derive(Debug, Clone)]
pub(crate) enum RefreshReply {
    Issue {
        access: String,
        refresh: String,
        expires_in: u64,
    },
    Status(u16),
}

impl RefreshReply {
    pub(crate) fn issue(access: &str, refresh: &str, expires_in: u64) -> Self {
        RefreshReply::Issue {
            access: access.into(),
            refresh: refresh.into(),
            expires_in,
        }
    }
}

pub(crate) struct MockApi {
    valid_access: Mutex<String>,
    refresh_reply: Mutex<RefreshReply>,
    refresh_gate: Option<Arc<Semaphore>>,
    refresh_delay: Duration,
    refresh_calls: AtomicUsize,
    refresh_tokens: Mutex<Vec<String>>,
    fixed: HashMap<String, (u16, String)>,
    always_unauthorized: HashSet<String>,
    unreachable: HashSet<String>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockApi {
    pub(crate) fn new(valid_access: &str) -> Self {
        Self {
            valid_access: Mutex::new(valid_access.to_string()),
            refresh_reply: Mutex::new(RefreshReply::Status(401)),
            refresh_gate: None,
            refresh_delay: Duration::ZERO,
            refresh_calls: AtomicUsize::new(0),
            refresh_tokens: Mutex::new(Vec::new()),
            fixed: HashMap::new(),
            always_unauthorized: HashSet::new(),
            unreachable: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn refresh_with(self, reply: RefreshReply) -> Self {
        *self.refresh_reply.lock().unwrap() = reply;
        self
    }

    /// Hold every refresh call until the test adds a permit.
    pub(crate) fn gate_refresh(mut self, gate: Arc<Semaphore>) -> Self {
        self.refresh_gate = Some(gate);
        self
    }

    pub(crate) fn delay_refresh(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Answer `path` with a fixed status and body, whatever the headers.
    pub(crate) fn respond(mut self, path: &str, status: u16, body: &str) -> Self {
        self.fixed.insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub(crate) fn always_unauthorized(mut self, path: &str) -> Self {
        self.always_unauthorized.insert(path.to_string());
        self
    }

    pub(crate) fn unreachable(mut self, path: &str) -> Self {
        self.unreachable.insert(path.to_string());
        self
    }

    pub(crate) fn set_refresh_reply(&self, reply: RefreshReply) {
        *self.refresh_reply.lock().unwrap() = reply;
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens.lock().unwrap().clone()
    }

    /// Every non-refresh request received, in arrival order.
    pub(crate) fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Authorization header values sent to `path`.
    pub(crate) fn bearers_sent_to(&self, path: &str) -> Vec<Option<String>> {
        self.requests()
            .iter()
            .filter(|r| r.path == path)
            .map(|r| header(r, AUTHORIZATION.as_str()))
            .collect()
    }

    async fn refresh(&self, request: &OutboundRequest) -> transport::Result<TransportResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let presented = request
            .body
            .as_ref()
            .and_then(|b| b["refreshToken"].as_str())
            .unwrap_or_default()
            .to_string();
        self.refresh_tokens.lock().unwrap().push(presented);

        if let Some(gate) = &self.refresh_gate {
            gate.acquire().await.unwrap().forget();
        }
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }

        let reply = self.refresh_reply.lock().unwrap().clone();
        match reply {
            RefreshReply::Issue {
                access,
                refresh,
                expires_in,
            } => {
                *self.valid_access.lock().unwrap() = access.clone();
                let body = serde_json::json!({
                    "accessToken": access,
                    "refreshToken": refresh,
                    "expiresIn": expires_in,
                });
                Ok(TransportResponse::new(200, body.to_string()))
            }
            RefreshReply::Status(status) => Ok(TransportResponse::new(
                status,
                r#"{"message":"Invalid refresh token"}"#,
            )),
        }
    }

    fn handle(&self, request: &OutboundRequest) -> transport::Result<TransportResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if self.unreachable.contains(&request.path) {
            return Err(TransportError::Connect("connection refused".into()));
        }
        if let Some((status, body)) = self.fixed.get(&request.path) {
            return Ok(TransportResponse::new(*status, body.clone()));
        }
        if self.always_unauthorized.contains(&request.path) {
            return Ok(TransportResponse::new(401, r#"{"message":"Unauthorized"}"#));
        }

        let expected = format!("Bearer {}", self.valid_access.lock().unwrap());
        if header(request, AUTHORIZATION.as_str()).as_deref() == Some(expected.as_str()) {
            let body = serde_json::json!({ "path": request.path });
            Ok(TransportResponse::new(200, body.to_string()))
        } else {
            Ok(TransportResponse::new(401, r#"{"message":"Unauthorized"}"#))
        }
    }
}

impl Transport for MockApi {
    fn send<'a>(
        &'a self,
        request: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = transport::Result<TransportResponse>> + Send + 'a>> {
        Box::pin(async move {
            if request.path == REFRESH_PATH {
                self.refresh(request).await
            } else {
                // Yield so concurrent callers interleave like real I/O.
                tokio::task::yield_now().await;
                self.handle(request)
            }
        })
    }
}

pub(crate) fn header(request: &OutboundRequest, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
