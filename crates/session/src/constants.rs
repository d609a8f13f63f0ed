//! Wire-level names shared by the gateway and the refresh call

/// Refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Header carrying the active tenant identifier.
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Header carrying the active tenant slug.
pub const TENANT_SLUG_HEADER: &str = "x-tenant-slug";

/// Scheme prefix for the Authorization header.
pub const BEARER_PREFIX: &str = "Bearer ";
