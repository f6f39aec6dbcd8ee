//! `/kdc/node` commands: add, list, get, update, set-state, delete.

use bytes::Bytes;
use domain::base::Name;
use serde::{Deserialize, Serialize};

use crate::NodeState;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: Name<Bytes>,
    /// The node's long-term X25519 public key, base64-encoded (32 bytes).
    pub public_key: String,
    pub notify_addr: Option<String>,
    pub state: NodeState,
    pub last_seen: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum NodeCommand {
    Add {
        id: Name<Bytes>,
        public_key: String,
        notify_addr: Option<String>,
    },
    List,
    Get {
        id: Name<Bytes>,
    },
    Update {
        id: Name<Bytes>,
        notify_addr: Option<String>,
    },
    SetState {
        id: Name<Bytes>,
        state: NodeState,
    },
    Delete {
        id: Name<Bytes>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeResult {
    Node(NodeDto),
    Nodes(Vec<NodeDto>),
    Deleted { deleted: u64 },
    Unit {},
}
