//! `/kdc/service-transaction` commands: start, add-component,
//! remove-component, view, commit (with dry-run), rollback, list,
//! get/status, cleanup.

use serde::{Deserialize, Serialize};

use crate::{membership::DeltaReport, TransactionState};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionDto {
    pub id: String,
    pub service_id: i64,
    pub state: TransactionState,
    pub created_at: i64,
    pub expires_at: i64,
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub author: Option<String>,
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ServiceTransactionCommand {
    Start {
        service_id: i64,
        author: Option<String>,
        comment: Option<String>,
    },
    AddComponent {
        tx_id: String,
        component_id: String,
    },
    RemoveComponent {
        tx_id: String,
        component_id: String,
    },
    View {
        tx_id: String,
    },
    Commit {
        tx_id: String,
        dry_run: bool,
    },
    Rollback {
        tx_id: String,
    },
    List,
    Get {
        tx_id: String,
    },
    Cleanup,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceTransactionResult {
    Transaction(TransactionDto),
    Transactions(Vec<TransactionDto>),
    Delta(DeltaReport),
    Cleaned { expired: u64 },
    Unit {},
}
