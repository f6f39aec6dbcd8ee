//! `/kdc/zone` commands: add, list, get, get-keys, generate-key,
//! encrypt-key, update, delete, distrib-single, distrib-multi, transition,
//! setstate, delete-key, purge-keys, set-service.

use bytes::Bytes;
use domain::base::Name;
use serde::{Deserialize, Serialize};

use crate::{Algorithm, KeyState, KeyType};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneDto {
    pub name: Name<Bytes>,
    pub active: bool,
    pub service_id: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyDto {
    pub id: i64,
    pub zone: Name<Bytes>,
    pub key_type: KeyType,
    pub keytag: u16,
    pub distribution_id: String,
    pub algorithm: Algorithm,
    pub flags: u16,
    pub public_key: String,
    pub state: KeyState,
    pub created_at: i64,
    pub published_at: Option<i64>,
    pub activated_at: Option<i64>,
    pub retired_at: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ZoneCommand {
    Add {
        name: Name<Bytes>,
        service_id: Option<i64>,
    },
    List,
    Get {
        name: Name<Bytes>,
    },
    GetKeys {
        name: Name<Bytes>,
    },
    GenerateKey {
        name: Name<Bytes>,
        key_type: KeyType,
        algorithm: Algorithm,
    },
    EncryptKey {
        name: Name<Bytes>,
        key_id: i64,
        node_id: Name<Bytes>,
    },
    Update {
        name: Name<Bytes>,
        active: Option<bool>,
    },
    Delete {
        name: Name<Bytes>,
    },
    DistribSingle {
        name: Name<Bytes>,
        key_id: i64,
        node_id: Name<Bytes>,
    },
    DistribMulti {
        name: Name<Bytes>,
        key_id: i64,
    },
    Transition {
        key_id: i64,
        to: KeyState,
    },
    Setstate {
        key_id: i64,
        to: KeyState,
    },
    DeleteKey {
        key_id: i64,
    },
    PurgeKeys {
        name: Name<Bytes>,
    },
    SetService {
        name: Name<Bytes>,
        service_id: Option<i64>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoneResult {
    Zone(ZoneDto),
    Zones(Vec<ZoneDto>),
    Keys(Vec<KeyDto>),
    Key(KeyDto),
    Distribution(crate::distrib::DistributionDto),
    /// `encrypt-key`'s result: the HPKE envelope, base64-encoded, not
    /// persisted as a distribution record.
    Encrypted { ciphertext: String },
    Deleted { deleted: u64 },
    Unit {},
}
