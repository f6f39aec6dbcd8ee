//! `/kdc/service-transaction`: start, add-component, remove-component,
//! view, commit, rollback, list, get, cleanup.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::catalog::ServiceTransactionRow;
use crate::center::Center;
use crate::error::KdcError;
use crate::http::respond;
use crate::transaction;
use signpost_api::transaction::{ServiceTransactionCommand, ServiceTransactionResult, TransactionDto};
use signpost_api::TransactionState;

pub async fn handle(
    State(center): State<Arc<Center>>,
    Json(command): Json<ServiceTransactionCommand>,
) -> (axum::http::StatusCode, Json<signpost_api::Envelope<ServiceTransactionResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: ServiceTransactionCommand) -> Result<ServiceTransactionResult, KdcError> {
    let pool = &center.pool;
    match command {
        ServiceTransactionCommand::Start { service_id, author, comment } => {
            let tx = transaction::start(pool, service_id, author.as_deref(), comment.as_deref()).await?;
            Ok(ServiceTransactionResult::Transaction(to_dto(&tx)?))
        }
        ServiceTransactionCommand::AddComponent { tx_id, component_id } => {
            let tx = transaction::add_component(pool, &tx_id, &component_id).await?;
            Ok(ServiceTransactionResult::Transaction(to_dto(&tx)?))
        }
        ServiceTransactionCommand::RemoveComponent { tx_id, component_id } => {
            let tx = transaction::remove_component(pool, &tx_id, &component_id).await?;
            Ok(ServiceTransactionResult::Transaction(to_dto(&tx)?))
        }
        ServiceTransactionCommand::View { tx_id } => Ok(ServiceTransactionResult::Delta(transaction::view(pool, &tx_id).await?)),
        ServiceTransactionCommand::Commit { tx_id, dry_run } => {
            Ok(ServiceTransactionResult::Delta(transaction::commit(center, &tx_id, dry_run).await?))
        }
        ServiceTransactionCommand::Rollback { tx_id } => {
            transaction::rollback(pool, &tx_id).await?;
            Ok(ServiceTransactionResult::Unit {})
        }
        ServiceTransactionCommand::List => {
            let txs = transaction::list(pool, None).await?;
            Ok(ServiceTransactionResult::Transactions(txs.iter().map(to_dto).collect::<Result<_, _>>()?))
        }
        ServiceTransactionCommand::Get { tx_id } => Ok(ServiceTransactionResult::Transaction(to_dto(&transaction::get(pool, &tx_id).await?)?)),
        ServiceTransactionCommand::Cleanup => {
            let expired = transaction::cleanup_expired(pool).await?;
            Ok(ServiceTransactionResult::Cleaned { expired })
        }
    }
}

fn parse_state(s: &str) -> Result<TransactionState, KdcError> {
    match s {
        "open" => Ok(TransactionState::Open),
        "committed" => Ok(TransactionState::Committed),
        "rolled_back" => Ok(TransactionState::RolledBack),
        other => Err(KdcError::Validation(format!("unknown transaction state stored in catalog: '{other}'"))),
    }
}

fn to_dto(tx: &ServiceTransactionRow) -> Result<TransactionDto, KdcError> {
    Ok(TransactionDto {
        id: tx.id.clone(),
        service_id: tx.service_id,
        state: parse_state(&tx.state)?,
        created_at: tx.created_at,
        expires_at: tx.expires_at,
        add: serde_json::from_str(&tx.add_components).unwrap_or_default(),
        remove: serde_json::from_str(&tx.remove_components).unwrap_or_default(),
        author: tx.author.clone(),
        comment: tx.comment.clone(),
    })
}
