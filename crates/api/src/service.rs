//! `/kdc/service` commands: add, list, get, update, delete.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceDto {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ServiceCommand {
    Add { name: String },
    List,
    Get { id: i64 },
    Update { id: i64, active: Option<bool> },
    Delete { id: i64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceResult {
    Service(ServiceDto),
    Services(Vec<ServiceDto>),
    Deleted { deleted: u64 },
}
