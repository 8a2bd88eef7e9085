//! Unified error model for the session/attestation core.
//! Session-lifecycle failures surface as state transitions plus an event, never
//! as panics; gateway failures are returned as values from `run`.

use thiserror::Error;

/// Failures while decoding an opaque credential into claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not a three-segment dot-delimited token.
    #[error("credential is not a three-segment token")]
    Malformed,
    /// Middle segment is not valid base64url.
    #[error("credential payload is not base64url")]
    PayloadEncoding,
    /// Payload bytes are not the expected JSON object.
    #[error("credential payload is not valid JSON")]
    PayloadJson,
    /// Payload carries no `exp` field; nothing can be scheduled from it.
    #[error("credential payload has no expiry")]
    MissingExpiry,
}

/// Why a `SessionStore::set` was refused. Both variants leave the store Absent.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("credential rejected: {0}")]
    Decode(#[from] DecodeError),
    /// Terminal condition, distinct from expiry and never retried.
    #[error("account is suspended")]
    Suspended,
}

/// Outcome of `AttestationGateway::run` when the wrapped submit never ran,
/// or ran and failed.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Another run on this gateway is still in flight; rejected synchronously
    /// with no network activity. Callers treat this as a no-op.
    #[error("a submission is already in flight")]
    DuplicateSubmission,
    /// All acquisition attempts were spent without a usable token. The
    /// mutation was never attempted; the user may retry the whole action.
    #[error("attestation token could not be acquired after {attempts} attempts")]
    AttestationFailed { attempts: u32 },
    /// The wrapped submit call failed. Propagated verbatim; the gateway does
    /// not retry it or interpret its meaning.
    #[error("submit failed: {0}")]
    Submit(#[source] anyhow::Error),
}
