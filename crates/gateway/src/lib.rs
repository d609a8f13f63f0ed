//! Client-side request gateway
//!
//! Sits between application code and the remote API. Every call goes through
//! `Gateway::execute`, which attaches the bearer credential and tenant
//! headers, sends the request, and on a 401 waits for a refreshed credential
//! and retries exactly once.
//!
//! Request lifecycle:
//! 1. `EndpointPolicy` decides whether the path is public / tenant-exempt
//! 2. Credential and tenant headers are attached from the session holders
//! 3. A 401 on a protected path hands off to `RefreshCoordinator`, which runs
//!    at most one refresh call no matter how many requests are waiting
//! 4. The retry's outcome is final; any error status goes through `classify`
//! 5. A failed refresh (or a second 401) clears the session and publishes
//!    `SessionEvent::LoggedOut`

pub mod classify;
pub mod coordinator;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod gateway;
pub mod metrics;
pub mod request;

#[cfg(test)]
mod test_support;

pub use classify::{classify, classify_transport_error};
pub use coordinator::{Phase, RefreshCoordinator};
pub use endpoints::EndpointPolicy;
pub use error::{ErrorKind, FieldErrors, NormalizedError, Result};
pub use events::{SessionEvent, SessionEvents};
pub use gateway::{Gateway, GatewayConfig};
pub use request::RequestDescriptor;
pub use transport::TransportResponse as Response;
