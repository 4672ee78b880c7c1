//! SCIM bearer authentication and body logging.
//!
//! Every SCIM route requires `Authorization: Bearer <token>` matching the
//! configured token. The configured token is kept only as a SHA-256 digest and
//! compared in constant time.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{AppState, config::ScimConfig, scim::ScimError};

/// Verifies bearer tokens against the configured secret.
#[derive(Clone)]
pub struct BearerAuth {
    token_digest: [u8; 32],
    challenge: HeaderValue,
}

impl BearerAuth {
    pub fn from_config(config: &ScimConfig) -> Self {
        let challenge = HeaderValue::from_str(&config.www_authenticate).unwrap_or_else(|_| {
            tracing::warn!(
                value = %config.www_authenticate,
                "Invalid WWW-Authenticate value, falling back to plain Bearer"
            );
            HeaderValue::from_static("Bearer")
        });
        Self {
            token_digest: Sha256::digest(config.bearer_token.as_bytes()).into(),
            challenge,
        }
    }

    pub fn verify(&self, token: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(token.as_bytes()).into();
        candidate.ct_eq(&self.token_digest).into()
    }

    fn reject(&self, detail: &str) -> Response {
        let mut response = ScimError::Unauthorized(detail.to_string()).into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, self.challenge.clone());
        response
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

/// Reject requests without a valid bearer token.
pub async fn scim_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(&request) else {
        tracing::debug!("SCIM request without bearer token");
        return state
            .auth
            .reject("Missing or invalid Authorization header. Expected: Bearer <token>");
    };

    if !state.auth.verify(token) {
        tracing::debug!("SCIM authentication failed: invalid token");
        return state.auth.reject("Invalid SCIM bearer token");
    }

    next.run(request).await
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    let auth_str = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = auth_str.split_at_checked(7)?;
    scheme.eq_ignore_ascii_case("Bearer ").then_some(token)
}

/// Debug-log request and response bodies when `log_bodies` is enabled.
pub async fn body_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.observability.logging.log_bodies {
        return next.run(request).await;
    }
    let limit = state.config.server.body_limit_bytes;

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(b) => b,
        Err(e) => {
            return ScimError::bad_request(format!("Could not read request body: {}", e))
                .into_response();
        }
    };
    tracing::debug!(
        method = %parts.method,
        uri = %parts.uri,
        body = %loggable_body(&bytes),
        "SCIM request"
    );
    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer SCIM response body");
            return ScimError::Internal("Failed to read response body".to_string())
                .into_response();
        }
    };
    tracing::debug!(status = %parts.status, body = %loggable_body(&bytes), "SCIM response");
    Response::from_parts(parts, Body::from(bytes))
}

/// Render a body for logging with password values masked.
fn loggable_body(bytes: &Bytes) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut value) => {
            mask_passwords(&mut value);
            value.to_string()
        }
        Err(_) => format!("<{} bytes of non-JSON body>", bytes.len()),
    }
}

/// Replace every value under a key containing `password` with asterisks of
/// the same length, or null when the value is empty.
fn mask_passwords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if key.to_ascii_lowercase().contains("password") {
                    *inner = match &*inner {
                        Value::String(s) if !s.is_empty() => {
                            Value::String("*".repeat(s.chars().count()))
                        }
                        _ => Value::Null,
                    };
                } else {
                    mask_passwords(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_passwords),
        _ => {}
    }
}
