//! Session state for the request gateway
//!
//! Holds the two pieces of per-user state the gateway attaches to outbound
//! calls, and the one remote call that renews them:
//! 1. `CredentialStore` keeps the current access/refresh credential pair
//! 2. `TenantContextProvider` keeps the active tenant, if any
//! 3. `token::refresh_token()` exchanges a refresh token for a new credential
//!
//! Neither holder coordinates writers. After initial login, the gateway's
//! refresh coordinator is the only writer.

pub mod constants;
pub mod credentials;
pub mod error;
pub mod tenant;
pub mod token;

pub use constants::*;
pub use credentials::{Credential, CredentialStore};
pub use error::{Error, Result};
pub use tenant::{TenantContext, TenantContextProvider};
pub use token::{TokenResponse, refresh_token};
