//! The transaction manager (spec §4.5).
//!
//! Stages a set of component add/remove operations against a service
//! behind a short opaque token, supports a dry-run view via the delta
//! engine, and commits atomically inside a DB transaction, triggering
//! distributions best-effort afterwards.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::catalog::{store, ServiceTransactionRow, TransactionSnapshot};
use crate::center::Center;
use crate::distribution;
use crate::error::KdcError;
use crate::membership;
use signpost_api::membership::DeltaReport;

const TRANSACTION_TTL_SECS: i64 = 60 * 60 * 24;

pub async fn start(pool: &SqlitePool, service_id: i64, author: Option<&str>, comment: Option<&str>) -> Result<ServiceTransactionRow, KdcError> {
    store::get_service(pool, service_id).await?;
    let now = crate::common::now();
    let components = active_component_ids(pool, service_id).await?;
    let snapshot = TransactionSnapshot { components };
    let snapshot_json = serde_json::to_string(&snapshot).expect("snapshot always serializes");
    let id = uuid::Uuid::new_v4().to_string();
    store::insert_transaction(pool, &id, service_id, &snapshot_json, author, comment, now, now + TRANSACTION_TTL_SECS).await
}

pub async fn add_component(pool: &SqlitePool, id: &str, component_id: &str) -> Result<ServiceTransactionRow, KdcError> {
    let tx = open_transaction(pool, id).await?;
    store::get_component(pool, component_id).await?;

    let mut add: Vec<String> = serde_json::from_str(&tx.add_components).unwrap_or_default();
    let mut remove: Vec<String> = serde_json::from_str(&tx.remove_components).unwrap_or_default();
    remove.retain(|c| c != component_id);
    if !add.iter().any(|c| c == component_id) {
        add.push(component_id.to_string());
    }
    store::update_transaction_changes(
        pool,
        id,
        &serde_json::to_string(&add).unwrap(),
        &serde_json::to_string(&remove).unwrap(),
    )
    .await?;
    store::get_transaction(pool, id).await
}

pub async fn remove_component(pool: &SqlitePool, id: &str, component_id: &str) -> Result<ServiceTransactionRow, KdcError> {
    let tx = open_transaction(pool, id).await?;
    store::get_component(pool, component_id).await?;

    let mut add: Vec<String> = serde_json::from_str(&tx.add_components).unwrap_or_default();
    let mut remove: Vec<String> = serde_json::from_str(&tx.remove_components).unwrap_or_default();
    add.retain(|c| c != component_id);
    if !remove.iter().any(|c| c == component_id) {
        remove.push(component_id.to_string());
    }
    store::update_transaction_changes(
        pool,
        id,
        &serde_json::to_string(&add).unwrap(),
        &serde_json::to_string(&remove).unwrap(),
    )
    .await?;
    store::get_transaction(pool, id).await
}

/// Pure computation: the delta report for the transaction's staged
/// changes, run against the service's *current* state (spec: `ViewTx`
/// runs on `(snapshot, changes)`, but the snapshot only matters for
/// optimistic-conflict detection at commit time).
pub async fn view(pool: &SqlitePool, id: &str) -> Result<DeltaReport, KdcError> {
    let tx = get(pool, id).await?;
    let add: Vec<String> = serde_json::from_str(&tx.add_components).unwrap_or_default();
    let remove: Vec<String> = serde_json::from_str(&tx.remove_components).unwrap_or_default();
    let now_components = active_component_ids(pool, tx.service_id).await?;
    membership::compute_delta(pool, tx.service_id, &now_components, &add, &remove).await
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<ServiceTransactionRow, KdcError> {
    store::get_transaction(pool, id).await
}

pub async fn list(pool: &SqlitePool, service_id: Option<i64>) -> Result<Vec<ServiceTransactionRow>, KdcError> {
    store::list_transactions(pool, service_id).await
}

/// `CommitTx`: re-read current components, warn on drift from the
/// snapshot, apply the change inside a DB transaction, mark committed,
/// and (unless `dry_run`) trigger distributions/revocations afterwards.
pub async fn commit(center: &Arc<Center>, id: &str, dry_run: bool) -> Result<DeltaReport, KdcError> {
    let pool = &center.pool;
    let tx_row = open_transaction(pool, id).await?;
    let add: Vec<String> = serde_json::from_str(&tx_row.add_components).unwrap_or_default();
    let remove: Vec<String> = serde_json::from_str(&tx_row.remove_components).unwrap_or_default();

    let now_components = active_component_ids(pool, tx_row.service_id).await?;
    let snapshot: TransactionSnapshot = serde_json::from_str(&tx_row.snapshot).unwrap_or(TransactionSnapshot { components: vec![] });
    if snapshot.components.iter().collect::<std::collections::BTreeSet<_>>()
        != now_components.iter().collect::<std::collections::BTreeSet<_>>()
    {
        tracing::warn!(
            "Service {} changed since transaction '{id}' was opened; committing against the current state",
            tx_row.service_id
        );
    }

    let report = membership::compute_delta(pool, tx_row.service_id, &now_components, &add, &remove).await?;
    if !report.is_valid {
        return Err(KdcError::Validation(
            "the resulting component set does not have exactly one signing component".into(),
        ));
    }

    if dry_run {
        return Ok(report);
    }

    let now = crate::common::now();
    let mut future: std::collections::BTreeSet<String> =
        now_components.into_iter().filter(|c| !remove.contains(c)).collect();
    future.extend(add.iter().cloned());
    let future: Vec<String> = future.into_iter().collect();

    let mut db_tx = pool.begin().await?;
    store::replace_service_components(&mut db_tx, tx_row.service_id, &future, now).await?;
    sqlx::query("UPDATE service_transactions SET state = 'committed' WHERE id = ?")
        .bind(id)
        .execute(&mut *db_tx)
        .await?;
    db_tx.commit().await?;

    distribution::apply_delta(center, &report).await;

    Ok(report)
}

pub async fn rollback(pool: &SqlitePool, id: &str) -> Result<(), KdcError> {
    open_transaction(pool, id).await?;
    store::set_transaction_state(pool, id, "rolled_back").await
}

/// `CleanupExpiredTx`: every open transaction past its expiry becomes
/// `rolled_back`.
pub async fn cleanup_expired(pool: &SqlitePool) -> Result<u64, KdcError> {
    store::expire_transactions(pool, crate::common::now()).await
}

async fn open_transaction(pool: &SqlitePool, id: &str) -> Result<ServiceTransactionRow, KdcError> {
    let tx = store::get_transaction(pool, id).await?;
    if tx.state != "open" {
        return Err(KdcError::Validation(format!("transaction '{id}' is no longer open (state: {})", tx.state)));
    }
    Ok(tx)
}

async fn active_component_ids(pool: &SqlitePool, service_id: i64) -> Result<Vec<String>, KdcError> {
    Ok(store::list_service_components(pool, service_id)
        .await?
        .into_iter()
        .map(|c| c.component_id)
        .collect())
}
