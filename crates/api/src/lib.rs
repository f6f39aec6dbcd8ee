//! Wire types shared between Signpost's HTTP admin API, its CLI client, and
//! the daemon itself.
//!
//! Every admin endpoint answers with an [`Envelope`] carrying either the
//! command's result or an [`ApiErrorKind`] with a human-readable message, per
//! the `{time, error?, error_msg?, msg?, ...}` convention of the admin API.

use serde::{Deserialize, Serialize};

pub mod component;
pub mod distrib;
pub mod dns;
pub mod krs;
pub mod membership;
pub mod node;
pub mod service;
pub mod transaction;
pub mod zone;

//----------- Envelope -----------------------------------------------------

/// The outer shape every admin API response takes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    /// A successful response, carrying the command's result flattened
    /// alongside the timestamp and an optional human message.
    Ok {
        time: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
        #[serde(flatten)]
        data: T,
    },
    /// A failed response.
    Err {
        time: i64,
        error: bool,
        error_msg: String,
    },
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope::Ok {
            time: now(),
            msg: None,
            data,
        }
    }

    pub fn ok_with_msg(data: T, msg: impl Into<String>) -> Self {
        Envelope::Ok {
            time: now(),
            msg: Some(msg.into()),
            data,
        }
    }

    pub fn err(err: impl std::fmt::Display) -> Self {
        Envelope::Err {
            time: now(),
            error: true,
            error_msg: err.to_string(),
        }
    }
}

fn now() -> i64 {
    jiff::Timestamp::now().as_second()
}

//----------- ApiErrorKind --------------------------------------------------

/// The kind of error an admin API call failed with (spec §7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiErrorKind {
    Validation,
    NotFound,
    Conflict,
    CryptoFailure,
    TransportFailure,
    Persistence,
    Freshness,
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApiErrorKind::Validation => "validation",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::Conflict => "conflict",
            ApiErrorKind::CryptoFailure => "crypto_failure",
            ApiErrorKind::TransportFailure => "transport_failure",
            ApiErrorKind::Persistence => "persistence",
            ApiErrorKind::Freshness => "freshness",
        })
    }
}

/// An error surfaced to an admin API caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

//----------- Common scalar DTOs --------------------------------------------

/// A key's algorithm, as accepted by `generate-key` and the `default_algorithm`
/// configuration option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    Ed25519,
    EcdsaP256,
    EcdsaP384,
    RsaSha256,
    RsaSha512,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Algorithm::Ed25519 => "Ed25519",
            Algorithm::EcdsaP256 => "ECDSA-P256",
            Algorithm::EcdsaP384 => "ECDSA-P384",
            Algorithm::RsaSha256 => "RSA-SHA256",
            Algorithm::RsaSha512 => "RSA-SHA512",
        })
    }
}

impl std::str::FromStr for Algorithm {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ed25519" => Ok(Algorithm::Ed25519),
            "ECDSA-P256" => Ok(Algorithm::EcdsaP256),
            "ECDSA-P384" => Ok(Algorithm::EcdsaP384),
            "RSA-SHA256" => Ok(Algorithm::RsaSha256),
            "RSA-SHA512" => Ok(Algorithm::RsaSha512),
            other => Err(ApiError::new(
                ApiErrorKind::Validation,
                format!("unknown algorithm '{other}'"),
            )),
        }
    }
}

/// A DNSSEC key type (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    Ksk,
    Zsk,
    Csk,
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyType::Ksk => "KSK",
            KeyType::Zsk => "ZSK",
            KeyType::Csk => "CSK",
        })
    }
}

/// A DNSSEC key's lifecycle state (spec §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    Created,
    Published,
    Standby,
    Active,
    ActiveDist,
    ActiveCe,
    Distributed,
    Edgesigner,
    Retired,
    Removed,
    Revoked,
}

impl std::fmt::Display for KeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyState::Created => "created",
            KeyState::Published => "published",
            KeyState::Standby => "standby",
            KeyState::Active => "active",
            KeyState::ActiveDist => "active_dist",
            KeyState::ActiveCe => "active_ce",
            KeyState::Distributed => "distributed",
            KeyState::Edgesigner => "edgesigner",
            KeyState::Retired => "retired",
            KeyState::Removed => "removed",
            KeyState::Revoked => "revoked",
        })
    }
}

impl std::str::FromStr for KeyState {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "created" => KeyState::Created,
            "published" => KeyState::Published,
            "standby" => KeyState::Standby,
            "active" => KeyState::Active,
            "active_dist" => KeyState::ActiveDist,
            "active_ce" => KeyState::ActiveCe,
            "distributed" => KeyState::Distributed,
            "edgesigner" => KeyState::Edgesigner,
            "retired" => KeyState::Retired,
            "removed" => KeyState::Removed,
            "revoked" => KeyState::Revoked,
            other => {
                return Err(ApiError::new(
                    ApiErrorKind::Validation,
                    format!("unknown key state '{other}'"),
                ))
            }
        })
    }
}

/// A node's reachability state (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Online,
    Offline,
    Compromised,
    Suspended,
}

/// A distribution record's delivery status (spec §4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionStatus {
    Pending,
    Completed,
}

/// A service transaction's state (spec §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}
