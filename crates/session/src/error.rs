//! Error types for session operations

/// Errors from the refresh endpoint and session bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token refresh failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("no refresh token available")]
    MissingRefreshToken,
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
