//! Webhook signature extractor.
//!
//! When a webhook secret is configured, requests must carry:
//!
//! - `X-Timestamp`: RFC 3339 time within [`MAX_CLOCK_SKEW_SECS`] of now
//! - `X-Signature`: lowercase hex SHA-256 of `"{timestamp}\n{body}\n{secret}"`

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Accepted distance between the sender's timestamp and local time.
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Why a signed request was rejected.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Missing {0} header")]
    MissingHeader(&'static str),
    #[error("Invalid timestamp")]
    InvalidTimestamp,
    #[error("Timestamp outside allowed window")]
    Expired,
    #[error("Invalid signature")]
    Mismatch,
}

/// Raw request body, verified against the webhook secret when one is set.
///
/// Consumes the body, so it must be the last handler argument:
///
/// ```ignore
/// async fn handler(State(state): State<AppState>, SignedBody(body): SignedBody) { .. }
/// ```
#[derive(Debug, Clone)]
pub struct SignedBody(pub Bytes);

impl FromRequest<AppState> for SignedBody {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if let Some(secret) = state.config.webhook_secret.as_deref() {
            verify_request(&headers, &body, secret, Utc::now()).map_err(|e| {
                tracing::warn!(error = %e, "Rejected webhook request");
                AppError::Unauthorized(e.to_string())
            })?;
        }

        Ok(SignedBody(body))
    }
}

/// Check the signature headers of a request against `body`.
pub fn verify_request(
    headers: &HeaderMap,
    body: &[u8],
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    let signature = header_str(headers, SIGNATURE_HEADER)?;

    let sent_at = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|_| SignatureError::InvalidTimestamp)?
        .with_timezone(&Utc);
    if (now - sent_at).num_seconds().abs() > MAX_CLOCK_SKEW_SECS {
        return Err(SignatureError::Expired);
    }

    let expected = sign(timestamp, body, secret);
    if !signatures_match(&expected, signature) {
        return Err(SignatureError::Mismatch);
    }
    Ok(())
}

/// Hex SHA-256 signature for `body` sent at `timestamp`.
pub fn sign(timestamp: &str, body: &[u8], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(b"\n");
    hasher.update(body);
    hasher.update(b"\n");
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(SignatureError::MissingHeader(name))
}

/// Constant-time comparison; differing lengths never match.
fn signatures_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
