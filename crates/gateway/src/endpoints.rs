//! Endpoint bypass policy
//!
//! Two path lists decide what the gateway attaches to a request:
//! - `public`: no credential, and a 401 is returned as-is instead of
//!   entering the refresh path
//! - `tenant_exempt`: no tenant headers
//!
//! A pattern ending in `/` matches by prefix. Any other pattern matches the
//! exact path or a sub-path (`/plans` matches `/plans` and `/plans/pro`).
//! Query strings are ignored.

use serde::Deserialize;
use session::REFRESH_PATH;

const DEFAULT_PUBLIC: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/forgot-password",
    "/auth/reset-password",
    "/auth/refresh",
    "/plans",
];

const DEFAULT_TENANT_EXEMPT: &[&str] = &["/auth/", "/plans", "/platform/", "/super-admin/"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointPolicy {
    pub public: Vec<String>,
    pub tenant_exempt: Vec<String>,
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        Self {
            public: DEFAULT_PUBLIC.iter().map(|p| p.to_string()).collect(),
            tenant_exempt: DEFAULT_TENANT_EXEMPT.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl EndpointPolicy {
    pub fn new(public: Vec<String>, tenant_exempt: Vec<String>) -> Self {
        Self {
            public,
            tenant_exempt,
        }
    }

    /// The refresh endpoint is public regardless of configuration, so a 401
    /// from it can never start another refresh.
    pub fn is_public(&self, path: &str) -> bool {
        path_matches(path, REFRESH_PATH) || self.public.iter().any(|p| path_matches(path, p))
    }

    pub fn is_tenant_exempt(&self, path: &str) -> bool {
        self.tenant_exempt.iter().any(|p| path_matches(path, p))
    }
}

fn path_matches(path: &str, pattern: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if pattern.ends_with('/') {
        return path.starts_with(pattern) || path == pattern.trim_end_matches('/');
    }
    match path.strip_prefix(pattern) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_public_endpoints() {
        let policy = EndpointPolicy::default();
        for path in [
            "/auth/login",
            "/auth/register",
            "/auth/forgot-password",
            "/auth/reset-password",
            "/auth/refresh",
            "/plans",
            "/plans/pro",
            "/auth/login?redirect=/jobs",
        ] {
            assert!(policy.is_public(path), "{path} should be public");
        }
        for path in ["/jobs", "/auth/me", "/auth/logout", "/planschedule", "/invoices/plans"] {
            assert!(!policy.is_public(path), "{path} should be protected");
        }
    }

    #[test]
    fn default_tenant_exempt_endpoints() {
        let policy = EndpointPolicy::default();
        for path in ["/auth/me", "/auth", "/plans", "/platform/tenants", "/super-admin/users/1"] {
            assert!(policy.is_tenant_exempt(path), "{path} should skip tenant headers");
        }
        for path in ["/jobs", "/customers/7", "/platformer"] {
            assert!(!policy.is_tenant_exempt(path), "{path} should carry tenant headers");
        }
    }

    #[test]
    fn refresh_path_is_always_public() {
        let policy = EndpointPolicy::new(vec![], vec![]);
        assert!(policy.is_public(REFRESH_PATH));
        assert!(!policy.is_public("/auth/login"));
        assert!(!policy.is_tenant_exempt("/auth/login"));
    }

    #[test]
    fn deserializes_with_defaults_for_missing_lists() {
        let policy: EndpointPolicy = serde_json::from_str(r#"{"public":["/status"]}"#).unwrap();
        assert!(policy.is_public("/status"));
        assert!(!policy.is_public("/auth/login"));
        assert!(policy.is_tenant_exempt("/platform/x"));
    }
}
