//! Request gateway
//!
//! Public entry point for outbound calls. Attaches tenant headers and the
//! bearer credential, dispatches, and resolves a 401 on a protected path by
//! waiting on the refresh coordinator and retrying once. A second 401 is
//! final: it ends the session instead of starting another refresh.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use session::{
    Credential, CredentialStore, TENANT_ID_HEADER, TENANT_SLUG_HEADER, TenantContext,
    TenantContextProvider,
};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};
use transport::{OutboundRequest, Transport, TransportResponse};

use crate::classify::{classify, classify_transport_error};
use crate::coordinator::RefreshCoordinator;
use crate::endpoints::EndpointPolicy;
use crate::error::Result;
use crate::events::{SessionEvent, SessionEvents};
use crate::metrics;
use crate::request::RequestDescriptor;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub policy: EndpointPolicy,
    /// Upper bound on one refresh call. Waiters are released with a terminal
    /// error once it elapses.
    pub refresh_timeout: Duration,
    pub event_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            policy: EndpointPolicy::default(),
            refresh_timeout: Duration::from_secs(30),
            event_capacity: 16,
        }
    }
}

pub struct Gateway {
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialStore>,
    tenant: Arc<TenantContextProvider>,
    policy: EndpointPolicy,
    coordinator: RefreshCoordinator,
    events: SessionEvents,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialStore>,
        tenant: Arc<TenantContextProvider>,
        config: GatewayConfig,
    ) -> Self {
        let events = SessionEvents::new(config.event_capacity);
        let coordinator = RefreshCoordinator::new(
            credentials.clone(),
            tenant.clone(),
            transport.clone(),
            events.clone(),
            config.refresh_timeout,
        );
        Self {
            transport,
            credentials,
            tenant,
            policy: config.policy,
            coordinator,
            events,
        }
    }

    /// Install the credential (and tenant) obtained at login.
    pub fn establish_session(&self, credential: Credential, tenant: Option<TenantContext>) {
        self.credentials.set(credential);
        if let Some(tenant) = tenant {
            self.tenant.set(tenant);
        }
    }

    /// Session events (logout) for the surrounding application.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn tenant(&self) -> &Arc<TenantContextProvider> {
        &self.tenant
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn policy(&self) -> &EndpointPolicy {
        &self.policy
    }

    /// Execute one request. Non-2xx statuses and transport failures come
    /// back as `NormalizedError`.
    #[instrument(skip_all, fields(request_id = %new_request_id(), method = %descriptor.method, path = %descriptor.path))]
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<TransportResponse> {
        let result = self.execute_inner(descriptor).await;
        match &result {
            Ok(response) => {
                debug!(status = response.status, "request succeeded");
                metrics::record_request("success");
            }
            Err(e) => {
                debug!(status = e.status_code, kind = e.kind.label(), "request failed");
                metrics::record_request(e.kind.label());
            }
        }
        result
    }

    async fn execute_inner(&self, descriptor: RequestDescriptor) -> Result<TransportResponse> {
        let public = descriptor.is_public(&self.policy);
        let tenant_exempt = descriptor.is_tenant_exempt(&self.policy);
        let mut request = descriptor.into_outbound();

        // The gateway owns these headers; callers cannot smuggle them in.
        request.headers.remove(AUTHORIZATION);
        request.headers.remove(TENANT_ID_HEADER);
        request.headers.remove(TENANT_SLUG_HEADER);

        if !tenant_exempt && let Some(tenant) = self.tenant.get() {
            attach_tenant(&mut request.headers, &tenant);
        }

        if public {
            return into_result(self.dispatch(&request).await?);
        }

        let credential = self.credentials.get();
        match &credential {
            Some(credential) => attach_credential(&mut request.headers, credential),
            None => debug!("no credential stored, sending unauthenticated"),
        }

        let response = self.dispatch(&request).await?;
        if response.status != 401 {
            return into_result(response);
        }

        debug!("request unauthorized, waiting for refreshed credential");
        let rejected = credential.as_ref().map(|c| c.access_token.expose_str());
        let fresh = self
            .coordinator
            .await_refreshed_credential_after(rejected)
            .await?;
        attach_credential(&mut request.headers, &fresh);

        let retry = self.dispatch(&request).await?;
        if retry.status == 401 {
            warn!("request still unauthorized after credential refresh");
            self.coordinator
                .force_logout("request rejected after credential refresh");
        }
        into_result(retry)
    }

    async fn dispatch(&self, request: &OutboundRequest) -> Result<TransportResponse> {
        self.transport.send(request).await.map_err(|e| {
            warn!(error = %e, "transport failure");
            classify_transport_error(&e)
        })
    }
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

fn into_result(response: TransportResponse) -> Result<TransportResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(classify(response.status, &response.body))
    }
}

fn attach_credential(headers: &mut HeaderMap, credential: &Credential) {
    match HeaderValue::from_str(&credential.bearer()) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(e) => {
            headers.remove(AUTHORIZATION);
            warn!(error = %e, "access token is not a valid header value, sending unauthenticated");
        }
    }
}

fn attach_tenant(headers: &mut HeaderMap, tenant: &TenantContext) {
    for (name, value) in [
        (TENANT_ID_HEADER, tenant.id.as_str()),
        (TENANT_SLUG_HEADER, tenant.slug.as_str()),
    ] {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(HeaderName::from_static(name), v);
            }
            Err(e) => {
                warn!(header = name, error = %e, "skipping invalid tenant header value");
            }
        }
    }
}
