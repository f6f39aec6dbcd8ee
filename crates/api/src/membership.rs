//! Shared delta-report types produced by the membership/delta engine
//! (spec §4.4) and surfaced by `ViewTx`/`CommitTx` (spec §4.5).

use bytes::Bytes;
use domain::base::Name;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServedPair {
    pub zone: Name<Bytes>,
    pub node: Name<Bytes>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub zone: Name<Bytes>,
    pub node: Name<Bytes>,
    pub key_ids: Vec<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationPlan {
    pub zone: Name<Bytes>,
    pub node: Name<Bytes>,
    pub key_ids: Vec<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeltaReport {
    pub newly_served: Vec<ServedPair>,
    pub no_longer_served: Vec<ServedPair>,
    pub distributions_to_create: Vec<DistributionPlan>,
    pub revocations_to_create: Vec<RevocationPlan>,
    pub is_valid: bool,
    pub summary: String,
}
