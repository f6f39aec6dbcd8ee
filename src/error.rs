//! Signpost's error kinds (spec §7).
//!
//! Mirrors `cascade`'s own convention: plain enums implementing
//! [`std::error::Error`] and [`fmt::Display`] by hand, no derive-macro error
//! crate. Each module that can fail produces one of these kinds; `From`
//! impls at module boundaries convert library errors (`sqlx`, `ring`) into
//! the right kind without losing the original message.

use std::fmt;

use signpost_api::ApiErrorKind;

/// The top-level error type threaded through the KDC's core operations.
#[derive(Debug)]
pub enum KdcError {
    /// Malformed input, unknown algorithm, illegal state transition, a
    /// service missing exactly one signing component.
    Validation(String),
    /// A referenced zone/node/key/distribution/transaction does not exist.
    NotFound(String),
    /// A duplicate node public key or component assignment.
    Conflict(String),
    /// An HPKE or PKCS#8 operation failed.
    CryptoFailure(String),
    /// A DNS exchange failed or returned a non-success RCODE.
    TransportFailure(String),
    /// A transient database error.
    Persistence(String),
    /// A manifest was older than its TTL, or carried a future timestamp.
    Freshness(String),
}

impl KdcError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            KdcError::Validation(_) => ApiErrorKind::Validation,
            KdcError::NotFound(_) => ApiErrorKind::NotFound,
            KdcError::Conflict(_) => ApiErrorKind::Conflict,
            KdcError::CryptoFailure(_) => ApiErrorKind::CryptoFailure,
            KdcError::TransportFailure(_) => ApiErrorKind::TransportFailure,
            KdcError::Persistence(_) => ApiErrorKind::Persistence,
            KdcError::Freshness(_) => ApiErrorKind::Freshness,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            KdcError::Validation(m)
            | KdcError::NotFound(m)
            | KdcError::Conflict(m)
            | KdcError::CryptoFailure(m)
            | KdcError::TransportFailure(m)
            | KdcError::Persistence(m)
            | KdcError::Freshness(m) => m,
        }
    }

    /// Turn this error into the API-facing representation, per spec §7:
    /// "the HTTP admin API returns `error=true` with the kind's message."
    pub fn into_api_error(self) -> signpost_api::ApiError {
        signpost_api::ApiError::new(self.kind(), self.message().to_string())
    }
}

impl fmt::Display for KdcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for KdcError {}

impl From<sqlx::Error> for KdcError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => KdcError::NotFound("no matching row".into()),
            other => KdcError::Persistence(other.to_string()),
        }
    }
}

impl From<crate::crypto::hpke::HpkeError> for KdcError {
    fn from(err: crate::crypto::hpke::HpkeError) -> Self {
        KdcError::CryptoFailure(err.to_string())
    }
}
