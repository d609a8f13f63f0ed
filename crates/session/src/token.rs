//! Refresh endpoint call
//!
//! POSTs the current refresh token to `REFRESH_PATH` and parses the new
//! credential triple. The call goes out without an Authorization header or
//! tenant headers: it is the one request that must work while the access
//! token is known to be bad.

use serde::{Deserialize, Serialize};
use transport::{OutboundRequest, Transport};

use crate::constants::REFRESH_PATH;
use crate::error::{Error, Result};

/// Response from the refresh endpoint.
///
/// `expires_in` is a delta in seconds from the response time. `refresh_token`
/// is absent when the server does not rotate refresh tokens.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(alias = "expiresInSeconds")]
    pub expires_in: u64,
}

/// Exchange a refresh token for a new credential triple.
pub async fn refresh_token(transport: &dyn Transport, refresh: &str) -> Result<TokenResponse> {
    let request = OutboundRequest::new(reqwest::Method::POST, REFRESH_PATH)
        .with_body(serde_json::json!({ "refreshToken": refresh }));

    let response = transport
        .send(&request)
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    if !response.is_success() {
        let status = response.status;
        let body = if response.body.is_empty() {
            "<no body>"
        } else {
            response.body.as_str()
        };

        // 401/403 means the refresh token is revoked or expired
        if status == 401 || status == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
}
