//! Gateway metrics
//!
//! Emitted through the `metrics` facade; without an installed recorder every
//! call is a no-op.
//!
//! - `gateway_requests_total` (counter): label `outcome`
//! - `gateway_refresh_total` (counter): label `result`
//! - `gateway_refresh_waiters_total` (counter)
//! - `gateway_session_teardown_total` (counter)

/// Record a finished `execute` call. `outcome` is "success" or an error kind label.
pub fn record_request(outcome: &str) {
    metrics::counter!("gateway_requests_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record the end of a refresh cycle ("success" or "failure").
pub fn record_refresh(result: &str) {
    metrics::counter!("gateway_refresh_total", "result" => result.to_string()).increment(1);
}

/// Record a caller that joined an in-flight refresh instead of starting one.
pub fn record_refresh_waiter() {
    metrics::counter!("gateway_refresh_waiters_total").increment(1);
}

pub fn record_teardown() {
    metrics::counter!("gateway_session_teardown_total").increment(1);
}
