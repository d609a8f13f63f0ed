//! Error classification for API failures
//!
//! Maps a raw failure (status code + response body) to a `NormalizedError`.
//! Pure: no I/O, no logging, no session side effects. Navigation on 403 and
//! logout on terminal 401 belong to the caller and the refresh coordinator.

use serde_json::Value;
use transport::TransportError;

use crate::error::{FieldErrors, NormalizedError};

pub const NETWORK_UNREACHABLE_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection.";

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

const UNKNOWN_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Fixed message for a status when the body offers nothing usable.
pub fn default_message(status: u16) -> &'static str {
    match status {
        0 => NETWORK_UNREACHABLE_MESSAGE,
        400 => "The request was invalid. Please check your input.",
        401 => "Please log in to continue.",
        403 => "You do not have permission to access this resource.",
        404 => "The requested resource was not found.",
        422 => "Validation failed. Please check your input.",
        429 => "Too many requests. Please wait a moment and try again.",
        500 => "An internal server error occurred. Please try again later.",
        502..=504 => "The service is temporarily unavailable. Please try again later.",
        501 | 505..=599 => "The server encountered an error. Please try again later.",
        _ => UNKNOWN_MESSAGE,
    }
}

/// Classify an error response by HTTP status and body.
///
/// - Status 0 always uses the fixed connectivity message.
/// - A body that is a plain string (JSON string or non-JSON text) is used
///   verbatim as the message.
/// - On 400/422 a JSON object's `message` and `errors` are passed through.
/// - Everything else gets the status's default message.
pub fn classify(status: u16, body: &str) -> NormalizedError {
    if status == 0 {
        return NormalizedError::new(0, NETWORK_UNREACHABLE_MESSAGE);
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return NormalizedError::new(status, default_message(status));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(text)) if !text.trim().is_empty() => NormalizedError::new(status, text),
        Ok(Value::Object(object)) if is_validation(status) => {
            let message = object
                .get("message")
                .and_then(message_text)
                .unwrap_or_else(|| default_message(status).to_string());
            let error = NormalizedError::new(status, message);
            match object.get("errors").and_then(field_errors) {
                Some(fields) => error.with_field_errors(fields),
                None => error,
            }
        }
        Ok(_) => NormalizedError::new(status, default_message(status)),
        Err(_) => NormalizedError::new(status, trimmed),
    }
}

/// A call that never produced a response is reported as status 0.
pub fn classify_transport_error(_error: &TransportError) -> NormalizedError {
    classify(0, "")
}

fn is_validation(status: u16) -> bool {
    status == 400 || status == 422
}

/// `message` may be a string or, from some validation pipes, a list of strings.
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}

/// `errors` maps field names to a list of messages or a single message.
fn field_errors(value: &Value) -> Option<FieldErrors> {
    let object = value.as_object()?;
    let mut fields = FieldErrors::new();
    for (field, messages) in object {
        let list: Vec<String> = match messages {
            Value::String(text) => vec![text.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => continue,
        };
        if !list.is_empty() {
            fields.insert(field.clone(), list);
        }
    }
    if fields.is_empty() { None } else { Some(fields) }
}
