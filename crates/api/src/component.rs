//! `/kdc/component` commands: add, list, get, update, delete.
//!
//! `/kdc/service-component` and `/kdc/node-component` commands also live
//! here, as they operate on the same membership join tables (spec §4.4).

use bytes::Bytes;
use domain::base::Name;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentDto {
    pub id: String,
    pub name: String,
    pub active: bool,
    /// Whether this is a system `sign_*` component (undeletable).
    pub system: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ComponentCommand {
    Add { id: String, name: String },
    List,
    Get { id: String },
    Update { id: String, active: Option<bool> },
    Delete { id: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentResult {
    Component(ComponentDto),
    Components(Vec<ComponentDto>),
    Deleted { deleted: u64 },
}

//----------- service-component ---------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ServiceComponentCommand {
    Add {
        service_id: i64,
        component_id: String,
    },
    Delete {
        service_id: i64,
        component_id: String,
    },
    List {
        service_id: i64,
    },
    /// Atomically replace the full active component set of a service.
    Replace {
        service_id: i64,
        component_ids: Vec<String>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceComponentResult {
    Components(Vec<ComponentDto>),
    Deleted { deleted: u64 },
    Unit {},
}

//----------- node-component -------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum NodeComponentCommand {
    Add {
        node_id: Name<Bytes>,
        component_id: String,
    },
    Delete {
        node_id: Name<Bytes>,
        component_id: String,
    },
    List {
        node_id: Name<Bytes>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeComponentResult {
    Components(Vec<ComponentDto>),
    Deleted { deleted: u64 },
    Unit {},
}
