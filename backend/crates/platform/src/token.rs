//! Signed Bearer Tokens
//!
//! Compact HMAC-signed tokens carrying a 16-byte subject and an expiry.
//! Layout before base64url encoding:
//!
//! ```text
//! subject (16) | expires_at_ms (i64, big-endian, 8) | HMAC-SHA256 over the first 24 bytes (32)
//! ```

use thiserror::Error;

use crate::crypto::{from_base64_url, hmac_sha256, to_base64_url, verify_hmac_sha256};

const SUBJECT_LEN: usize = 16;
const PAYLOAD_LEN: usize = SUBJECT_LEN + 8;
const TOKEN_LEN: usize = PAYLOAD_LEN + 32;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,
}

/// Sign a token for `subject` valid until `expires_at_ms` (unix millis)
pub fn sign_token(subject: &[u8; 16], expires_at_ms: i64, secret: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(TOKEN_LEN);
    data.extend_from_slice(subject);
    data.extend_from_slice(&expires_at_ms.to_be_bytes());
    let signature = hmac_sha256(secret, &data);
    data.extend_from_slice(&signature);
    to_base64_url(&data)
}

/// Verify a token and return its subject
///
/// The signature is checked before the expiry so that a forged token never
/// reveals anything about timing.
pub fn verify_token(token: &str, secret: &[u8; 32], now_ms: i64) -> Result<[u8; 16], TokenError> {
    let data = from_base64_url(token).map_err(|_| TokenError::Malformed)?;
    if data.len() != TOKEN_LEN {
        return Err(TokenError::Malformed);
    }

    let (payload, signature) = data.split_at(PAYLOAD_LEN);
    if !verify_hmac_sha256(secret, payload, signature) {
        return Err(TokenError::BadSignature);
    }

    let (subject, expires) = payload.split_at(SUBJECT_LEN);
    let expires_at_ms = i64::from_be_bytes(expires.try_into().map_err(|_| TokenError::Malformed)?);
    if now_ms >= expires_at_ms {
        return Err(TokenError::Expired);
    }

    subject.try_into().map_err(|_| TokenError::Malformed)
}

/// Extract the token part of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
