//! API-key authentication for the record routes.
//!
//! Keys are pre-shared secrets configured once at startup. Comparison goes
//! through SHA-256 digests of both sides, so the time it takes does not
//! depend on how much of a configured key the caller guessed.
//!
//! Photo retrieval stays open to unauthenticated `GET`s so plain `<img>`
//! tags work without headers, and `OPTIONS` preflight passes through.

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

/// Header carrying the pre-shared key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// The configured set of accepted API keys.
#[derive(Clone)]
pub struct ApiKeys {
    keys: Arc<HashSet<String>>,
}

impl ApiKeys {
    /// Parses a comma-separated list of keys, ignoring blank entries.
    pub fn from_env_value(raw: &str) -> Self {
        let keys = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect::<HashSet<_>>();
        Self {
            keys: Arc::new(keys),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Constant-time membership test against the configured keys.
    pub fn accepts(&self, provided: &str) -> bool {
        let provided = Sha256::digest(provided.as_bytes());
        self.keys
            .iter()
            .any(|key| Sha256::digest(key.as_bytes()) == provided)
    }
}

/// Middleware requiring a valid `X-API-Key` on record routes.
pub async fn require_api_key(
    State(keys): State<ApiKeys>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if bypasses_auth(req.method(), req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match provided {
        Some(key) if keys.accepts(&key) => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!(method = %req.method(), uri = %req.uri(), "invalid API key");
            Err((StatusCode::UNAUTHORIZED, "Invalid API key"))
        }
        None => {
            tracing::warn!(method = %req.method(), uri = %req.uri(), "missing API key");
            Err((StatusCode::UNAUTHORIZED, "Missing API key"))
        }
    }
}

/// Preflight requests and unauthenticated photo reads skip the gate.
fn bypasses_auth(method: &Method, path: &str) -> bool {
    if method == Method::OPTIONS {
        return true;
    }
    method == Method::GET && path.starts_with("/records/") && path.contains("/photos/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_keys() {
        let keys = ApiKeys::from_env_value(" alpha , beta ,, ");
        assert_eq!(keys.len(), 2);
        assert!(keys.accepts("alpha"));
        assert!(keys.accepts("beta"));
        assert!(!keys.accepts("gamma"));
    }

    #[test]
    fn empty_configuration_accepts_nothing() {
        let keys = ApiKeys::from_env_value("");
        assert!(keys.is_empty());
        assert!(!keys.accepts(""));
        assert!(!keys.accepts("anything"));
    }

    #[test]
    fn photo_gets_bypass_the_gate() {
        assert!(bypasses_auth(
            &Method::GET,
            "/records/+12025550100/photos/20240101-120000-1.png"
        ));
        assert!(!bypasses_auth(
            &Method::POST,
            "/records/+12025550100/photos/20240101-120000-1.png"
        ));
    }

    #[test]
    fn record_routes_do_not_bypass_the_gate() {
        assert!(!bypasses_auth(&Method::GET, "/records/+12025550100"));
        assert!(!bypasses_auth(&Method::POST, "/records/+12025550100"));
    }

    #[test]
    fn preflight_bypasses_the_gate() {
        assert!(bypasses_auth(&Method::OPTIONS, "/records/+12025550100"));
    }
}
