//! Pure decoder from the opaque credential string into structured claims.
//!
//! The client decodes the payload segment for display and scheduling only;
//! signature verification is the server's job on every request, so a
//! successful local decode proves nothing about validity.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;

use crate::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
}

/// Structured fields decoded from a credential. Recomputed only when the
/// credential is replaced, never edited field-by-field.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub subject_id: String,
    pub role_id: i64,
    pub expires_at_epoch_secs: i64,
    pub must_change_password: bool,
    pub account_status: AccountStatus,
}

impl Claims {
    pub fn expires_at_ms(&self) -> i64 {
        self.expires_at_epoch_secs.saturating_mul(1000)
    }
}

/// Wire payload of the credential's middle segment. Only `exp` is required;
/// everything else defaults to the most restrictive useful value.
#[derive(Debug, Deserialize)]
struct RawPayload {
    exp: Option<i64>,
    #[serde(default)]
    role_id: i64,
    #[serde(default)]
    user_id: serde_json::Value,
    // 0 = suspended; the issuer writes 1 for active.
    #[serde(default = "default_status")]
    status: i64,
    #[serde(default)]
    must_change_password: serde_json::Value,
}

fn default_status() -> i64 {
    1
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn value_to_flag(v: &serde_json::Value) -> bool {
    match v {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

/// Decode a three-segment credential. Never panics; every malformed input
/// maps to a `DecodeError`.
pub fn decode(credential: &str) -> Result<Claims, DecodeError> {
    let mut segments = credential.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Malformed);
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(DecodeError::Malformed);
    }

    // Issuers are inconsistent about padding; accept both forms.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .map_err(|_| DecodeError::PayloadEncoding)?;
    let raw: RawPayload =
        serde_json::from_slice(&bytes).map_err(|_| DecodeError::PayloadJson)?;

    let exp = raw.exp.ok_or(DecodeError::MissingExpiry)?;
    let account_status = if raw.status == 0 {
        AccountStatus::Suspended
    } else {
        AccountStatus::Active
    };
    Ok(Claims {
        subject_id: value_to_string(&raw.user_id),
        role_id: raw.role_id,
        expires_at_epoch_secs: exp,
        must_change_password: value_to_flag(&raw.must_change_password),
        account_status,
    })
}
