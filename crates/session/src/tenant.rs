//! Active tenant holder
//!
//! The gateway reads a snapshot per request; the surrounding application sets
//! it when the user picks an organization, and session teardown clears it.

use std::sync::{RwLock, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The organization whose data the current requests are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub id: String,
    pub slug: String,
}

impl TenantContext {
    pub fn new(id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TenantContextProvider {
    current: RwLock<Option<TenantContext>>,
}

impl TenantContextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(tenant: TenantContext) -> Self {
        Self {
            current: RwLock::new(Some(tenant)),
        }
    }

    pub fn get(&self) -> Option<TenantContext> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn set(&self, tenant: TenantContext) {
        debug!(tenant_id = %tenant.id, tenant_slug = %tenant.slug, "tenant selected");
        *self.write() = Some(tenant);
    }

    pub fn clear(&self) {
        if self.write().take().is_some() {
            debug!("tenant cleared");
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TenantContext>> {
        self.current.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let provider = TenantContextProvider::new();
        assert!(provider.get().is_none());
    }

    #[test]
    fn set_then_clear() {
        let provider = TenantContextProvider::new();
        provider.set(TenantContext::new("t-1", "acme"));
        assert_eq!(provider.get(), Some(TenantContext::new("t-1", "acme")));

        provider.clear();
        assert!(provider.get().is_none());
    }

    #[test]
    fn with_tenant_switches_on_set() {
        let provider = TenantContextProvider::with_tenant(TenantContext::new("t-1", "acme"));
        provider.set(TenantContext::new("t-2", "globex"));
        let tenant = provider.get().unwrap();
        assert_eq!(tenant.id, "t-2");
        assert_eq!(tenant.slug, "globex");
    }

    #[test]
    fn tenant_context_deserializes() {
        let tenant: TenantContext =
            serde_json::from_str(r#"{"id":"t-9","slug":"initech"}"#).unwrap();
        assert_eq!(tenant, TenantContext::new("t-9", "initech"));
    }
}
