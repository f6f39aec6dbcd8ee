//! `/krs/keys`, `/krs/query`, and `/krs/debug` commands, answered by the
//! Key Receiving Service running on an edge signer node.

use bytes::Bytes;
use domain::base::Name;
use serde::{Deserialize, Serialize};

use crate::{KeyState, KeyType};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstalledKeyDto {
    pub zone: Name<Bytes>,
    pub key_type: KeyType,
    pub keytag: u16,
    pub algorithm: String,
    pub public_key: String,
    pub state: KeyState,
    pub installed_at: i64,
    pub retired_at: Option<i64>,
    pub retire_time_secs: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum KrsKeysCommand {
    List,
    Get { zone: Name<Bytes>, keytag: u16 },
    GetByZone { zone: Name<Bytes> },
    Hash,
    Purge,
    Delete { zone: Name<Bytes>, keytag: u16 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KrsKeysResult {
    Keys(Vec<InstalledKeyDto>),
    Key(InstalledKeyDto),
    Hash(String),
    Purged { purged: u64 },
    Deleted { deleted: u64 },
}

/// A query for the manifest or a chunk of a distribution, as answered by
/// `query-kmreq` (spec §4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum KrsQueryCommand {
    QueryKmreq {
        node_id: Name<Bytes>,
        distribution_id: String,
        /// `None` for the manifest itself; `Some(idx)` for chunk `idx`.
        chunk: Option<u16>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestDto {
    pub chunk_count: u16,
    pub chunk_size: u16,
    pub checksum: String,
    pub metadata: serde_json::Value,
    pub payload: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkDto {
    pub sequence: u16,
    pub total: u16,
    pub data: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KrsQueryResult {
    Manifest(ManifestDto),
    Chunk(ChunkDto),
}

/// Debug-only commands for manually driving a distribution fetch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum KrsDebugCommand {
    FetchDistribution {
        kdc_addr: String,
        node_id: Name<Bytes>,
        distribution_id: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KrsDebugResult {
    Installed { installed: Vec<InstalledKeyDto> },
}
