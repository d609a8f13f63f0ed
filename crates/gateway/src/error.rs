//! Normalized error taxonomy
//!
//! `NormalizedError` is the only error shape callers of the gateway see.
//! Transport failures, error statuses and failed refresh cycles all collapse
//! into it.

use std::collections::BTreeMap;

use serde::Serialize;

/// Field name → validation messages, as returned by the API on 400/422.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Status 0: the server was never reached
    NetworkUnreachable,
    /// 400/422, may carry field errors
    ValidationFailed,
    /// 401 after the single refresh-and-retry, or a failed refresh
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    /// 5xx
    ServerError,
    Unknown,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            0 => ErrorKind::NetworkUnreachable,
            400 | 422 => ErrorKind::ValidationFailed,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::ServerError,
            _ => ErrorKind::Unknown,
        }
    }

    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::NetworkUnreachable => "network_unreachable",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} (status {status_code})")]
#[serde(rename_all = "camelCase")]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

impl NormalizedError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status_code),
            status_code,
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn with_field_errors(mut self, field_errors: FieldErrors) -> Self {
        self.field_errors = Some(field_errors);
        self
    }

    /// Terminal error handed to every waiter of a failed refresh cycle.
    pub fn session_expired() -> Self {
        Self::new(401, crate::classify::SESSION_EXPIRED_MESSAGE)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, NormalizedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_status() {
        assert_eq!(ErrorKind::from_status(0), ErrorKind::NetworkUnreachable);
        assert_eq!(ErrorKind::from_status(400), ErrorKind::ValidationFailed);
        assert_eq!(ErrorKind::from_status(422), ErrorKind::ValidationFailed);
        assert_eq!(ErrorKind::from_status(401), ErrorKind::Unauthorized);
        assert_eq!(ErrorKind::from_status(403), ErrorKind::Forbidden);
        assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_status(429), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::from_status(500), ErrorKind::ServerError);
        assert_eq!(ErrorKind::from_status(503), ErrorKind::ServerError);
        assert_eq!(ErrorKind::from_status(409), ErrorKind::Unknown);
        assert_eq!(ErrorKind::from_status(302), ErrorKind::Unknown);
    }

    #[test]
    fn serializes_camel_case_without_empty_field_errors() {
        let err = NormalizedError::new(404, "The requested resource was not found.");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["statusCode"], 404);
        assert!(json.get("fieldErrors").is_none());
    }

    #[test]
    fn field_errors_serialize_as_map() {
        let mut fields = FieldErrors::new();
        fields.insert("email".into(), vec!["must be an email".into()]);
        let err = NormalizedError::new(422, "Validation failed").with_field_errors(fields);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["fieldErrors"]["email"][0], "must be an email");
    }

    #[test]
    fn display_includes_status() {
        let err = NormalizedError::session_expired();
        assert!(err.is_unauthorized());
        assert!(err.to_string().ends_with("(status 401)"));
    }
}
