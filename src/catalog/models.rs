//! Row types for the catalog database (spec §3).
//!
//! These mirror the schema in `migrations/0001_initial.sql` directly;
//! FQDN/public-key typing is applied one layer up, in [`crate::http`] and
//! [`signpost_api`], to keep the store's SQL surface simple.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ComponentRow {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub system: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ZoneRow {
    pub name: String,
    pub active: bool,
    pub service_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct NodeRow {
    pub id: String,
    pub public_key: Vec<u8>,
    pub notify_addr: Option<String>,
    pub state: String,
    pub last_seen: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct KeyRow {
    pub id: i64,
    pub zone: String,
    pub key_type: String,
    pub keytag: i64,
    pub distribution_id: String,
    pub algorithm: String,
    pub flags: i64,
    pub public_key: String,
    pub private_key: Vec<u8>,
    pub state: String,
    pub comment: Option<String>,
    pub created_at: i64,
    pub published_at: Option<i64>,
    pub activated_at: Option<i64>,
    pub retired_at: Option<i64>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct DistributionRow {
    pub id: i64,
    pub distribution_id: String,
    pub zone: String,
    pub key_id: i64,
    pub node: String,
    pub ciphertext: Vec<u8>,
    pub ephemeral_pub: Vec<u8>,
    pub status: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub completed_at: Option<i64>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ConfirmationRow {
    pub id: i64,
    pub distribution_id: String,
    pub zone: String,
    pub key_id: i64,
    pub node: String,
    pub confirmed_at: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ServiceComponentRow {
    pub service_id: i64,
    pub component_id: String,
    pub active: bool,
    pub since: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct NodeComponentRow {
    pub node_id: String,
    pub component_id: String,
    pub active: bool,
    pub since: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ServiceTransactionRow {
    pub id: String,
    pub service_id: i64,
    pub state: String,
    pub created_at: i64,
    pub expires_at: i64,
    /// JSON-encoded `Vec<String>` of component ids to add.
    pub add_components: String,
    /// JSON-encoded `Vec<String>` of component ids to remove.
    pub remove_components: String,
    /// JSON-encoded [`TransactionSnapshot`].
    pub snapshot: String,
    pub author: Option<String>,
    pub comment: Option<String>,
}

/// The service's active component set at the moment a transaction started,
/// used by `CommitTx` to detect a concurrent change (spec §4.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub components: Vec<String>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct NodeIdentityRow {
    pub id: i64,
    pub node_id: String,
    pub public_key: Vec<u8>,
    pub private_key: Vec<u8>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct InstalledKeyRow {
    pub id: i64,
    pub zone: String,
    pub key_type: String,
    pub keytag: i64,
    pub distribution_id: String,
    pub algorithm: String,
    pub public_key: String,
    pub private_key: Vec<u8>,
    pub state: String,
    pub installed_at: i64,
    pub retired_at: Option<i64>,
    pub retire_time_secs: i64,
}
