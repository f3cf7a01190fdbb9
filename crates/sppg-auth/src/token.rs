//! Offline access-token validity check
//!
//! Decodes the JWT payload without verifying the signature. Used only to
//! skip requests with a token already known to be expired.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use serde_json::Value;

/// Check `token` against the current wall-clock time. Never touches the network.
pub fn local_token_is_valid(token: &str) -> bool {
    let now = Utc::now().timestamp_millis() as f64 / 1000.0;
    token_is_valid_at(token, now)
}

/// A token is valid when it has three non-empty dot-separated segments, its
/// payload decodes to a JSON object, and its `exp` claim (seconds since the
/// epoch) is either absent or strictly after `now`.
pub fn token_is_valid_at(token: &str, now: f64) -> bool {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return false;
    }

    let Some(claims) = decode_payload(segments[1]) else {
        return false;
    };

    match claims.get("exp") {
        None | Some(Value::Null) => true,
        Some(exp) => exp.as_f64().is_some_and(|exp| exp > now),
    }
}

fn decode_payload(segment: &str) -> Option<serde_json::Map<String, Value>> {
    // Some issuers pad their base64url segments
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}
