//! Backend response envelope
//!
//! The backend wraps payloads as `{ "success": bool, ...payload }` and reports
//! failures as `{ "success": false, "error": "..." }` (some routes use
//! `message` instead of `error`).

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::request::ApiResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    /// `success` was not false, the status was 2xx and the payload decoded
    Ok(T),
    /// The server refused the request; carries the server's message
    Rejected(String),
    /// A 2xx response whose body did not have the expected shape
    Malformed,
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn decode(response: &ApiResponse) -> Self {
        let explicit_failure = response.body.get("success").and_then(Value::as_bool) == Some(false);

        if !response.is_success() || explicit_failure {
            return Envelope::Rejected(failure_message(response));
        }

        match response.decode::<T>() {
            Ok(payload) => Envelope::Ok(payload),
            Err(e) => {
                tracing::debug!(status = response.status, error = %e, "Unexpected response shape");
                Envelope::Malformed
            }
        }
    }
}

/// Best message for a failed response: `error`, then `message`, then the status.
pub fn failure_message(response: &ApiResponse) -> String {
    ["error", "message"]
        .iter()
        .filter_map(|field| response.body.get(*field))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .unwrap_or_else(|| format!("Request failed with status {}", response.status))
}
