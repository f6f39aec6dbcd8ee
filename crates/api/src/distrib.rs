//! `/kdc/distrib` commands: list, state, completed, purge (with force).

use bytes::Bytes;
use domain::base::Name;
use serde::{Deserialize, Serialize};

use crate::DistributionStatus;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributionDto {
    /// The 4-hex-digit distribution identifier (spec §3).
    pub distribution_id: String,
    pub zone: Name<Bytes>,
    pub key_id: i64,
    pub recipients: Vec<Name<Bytes>>,
    pub confirmed: Vec<Name<Bytes>>,
    pub status: DistributionStatus,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum DistribCommand {
    List,
    State { distribution_id: String },
    Completed,
    Purge { force: bool },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DistribResult {
    Distributions(Vec<DistributionDto>),
    Distribution(DistributionDto),
    Purged { purged: u64 },
}
