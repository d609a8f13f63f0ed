//! In-memory credential holder
//!
//! Holds at most one current credential. A `Credential` is never mutated in
//! place: `set` swaps the whole value under an `RwLock`, so a reader either
//! sees the old pair or the new pair, never a mix of the two. The lock is
//! never held across an await, which lets the refresh coordinator read the
//! store while holding its own state lock.
//!
//! Where the credential is persisted between runs is the embedding
//! application's concern; this store only holds the live value.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use common::Secret;
use tracing::debug;

use crate::constants::BEARER_PREFIX;
use crate::token::TokenResponse;

/// An access/refresh token pair as issued by the remote API.
///
/// `expires_in_seconds` is the lifetime reported at issue time; `issued_at`
/// records when this process received it so `expires_at()` can be derived.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub expires_in_seconds: u64,
    pub issued_at: Instant,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_seconds: u64,
    ) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            refresh_token: Secret::new(refresh_token.into()),
            expires_in_seconds,
            issued_at: Instant::now(),
        }
    }

    /// Build a credential from a refresh response.
    ///
    /// Some deployments rotate the refresh token on every call and some keep
    /// it; when the response omits one, `previous_refresh` is carried over.
    pub fn from_token_response(response: TokenResponse, previous_refresh: &Secret<String>) -> Self {
        let refresh_token = match response.refresh_token {
            Some(rotated) => Secret::new(rotated),
            None => previous_refresh.clone(),
        };
        Self {
            access_token: Secret::new(response.access_token),
            refresh_token,
            expires_in_seconds: response.expires_in,
            issued_at: Instant::now(),
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.issued_at + Duration::from_secs(self.expires_in_seconds)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at()
    }

    /// `Authorization` header value for this credential.
    pub fn bearer(&self) -> String {
        format!("{BEARER_PREFIX}{}", self.access_token.expose_str())
    }
}

/// Holder for the current credential.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a credential already in place (initial login).
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: RwLock::new(Some(credential)),
        }
    }

    /// Snapshot of the current credential.
    pub fn get(&self) -> Option<Credential> {
        self.read().clone()
    }

    /// Replace the current credential as a single unit.
    pub fn set(&self, credential: Credential) {
        *self.write() = Some(credential);
        debug!("credential replaced");
    }

    /// Drop the current credential. Returns whether one was present.
    pub fn clear(&self) -> bool {
        let had_credential = self.write().take().is_some();
        if had_credential {
            debug!("credential cleared");
        }
        had_credential
    }

    pub fn access_token(&self) -> Option<Secret<String>> {
        self.read().as_ref().map(|c| c.access_token.clone())
    }

    /// The stored refresh token, if there is a usable one. An empty token
    /// (a session seeded with an access token only) counts as none.
    pub fn refresh_token(&self) -> Option<Secret<String>> {
        self.read()
            .as_ref()
            .map(|c| c.refresh_token.clone())
            .filter(|t| !t.expose_str().is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    // Writers replace the whole Option, so a poisoned lock still holds a
    // complete value.
    fn read(&self) -> RwLockReadGuard<'_, Option<Credential>> {
        self.current.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Credential>> {
        self.current.write().unwrap_or_else(|p| p.into_inner())
    }
}
