//! Optional HTTP basic auth.
//!
//! Active only when both a username and a password are configured. The
//! health probe is mounted outside this middleware.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use relay_core::config::BasicAuthCredentials;

use crate::error::AppError;
use crate::AppState;

pub async fn basic_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.basic_auth.as_deref() else {
        return Ok(next.run(request).await);
    };

    let given = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_header);

    match given {
        Some((username, password)) if credentials_match(&username, &password, expected) => {
            Ok(next.run(request).await)
        }
        Some((username, _)) => {
            tracing::warn!(user = %username, "Rejected basic auth attempt");
            Err(AppError::Unauthorized("Invalid credentials".to_string()))
        }
        None => Err(AppError::Unauthorized("Invalid credentials".to_string())),
    }
}

/// Decode `Basic <base64(user:pass)>`.
fn parse_basic_header(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Compare fixed-length digests so timing does not leak the secret length.
/// Both halves are always evaluated.
fn credentials_match(username: &str, password: &str, expected: &BasicAuthCredentials) -> bool {
    let digest = |value: &str| Sha256::digest(value.as_bytes());
    let user_ok = digest(username) == digest(&expected.username);
    let pass_ok = digest(password) == digest(&expected.password);
    user_ok & pass_ok
}
