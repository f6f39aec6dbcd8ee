//! The DNS wire surface's QTYPEs and its one cross-daemon message, NOTIFY
//! (spec §6): carried as a small JSON command rather than a raw DNS packet
//! so it rides the same HTTP admin transport as everything else, per
//! `SPEC_FULL.md`'s transport decision.

use serde::{Deserialize, Serialize};

/// One of the three private-use resource record types spec §6 defines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QType {
    Kmctrl,
    Jsonmanifest,
    Jsonchunk,
}

impl std::fmt::Display for QType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            QType::Kmctrl => "KMCTRL",
            QType::Jsonmanifest => "JSONMANIFEST",
            QType::Jsonchunk => "JSONCHUNK",
        })
    }
}

/// A NOTIFY: QNAME `<distribution-id>.<control-zone>`, QTYPE JSONMANIFEST.
/// Sent by the KDC to a recipient node when a distribution is ready, and
/// sent back by a node to the KDC once it has installed the keys (spec
/// §4.6 steps 4-5: "triggers work on either side").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotifyCommand {
    pub qname: String,
    pub qtype: QType,
    /// The sending node's identity, carried only on a node's confirmation
    /// push back to the KDC — absent on the KDC's push to a node, which
    /// already knows its own address from the node catalog.
    #[serde(default)]
    pub node_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotifyResult {
    pub acknowledged: bool,
}

/// A KMCTRL record: per-key control metadata for pull-style discovery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KmctrlDto {
    pub zone: String,
    pub key_id: i64,
    pub distribution_id: String,
    pub state: String,
}
