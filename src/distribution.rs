//! The distribution engine (spec §4.6).
//!
//! Couples the key-state machine to per-recipient HPKE encryption and a
//! DNS NOTIFY push, tracks confirmations, and detects completion.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::catalog::{store, DistributionRow, KeyRow, NodeRow};
use crate::center::Center;
use crate::crypto::hpke;
use crate::error::KdcError;
use crate::state_machine::{self, Event};
use signpost_api::membership::DeltaReport;

const EPHEMERAL_PUB_LEN: usize = 32;

/// Apply every distribution a committed delta calls for (spec §4.5's
/// `CommitTx` step 4), logging and continuing past per-recipient failures
/// so one bad node doesn't block the rest of the rollout.
pub async fn apply_delta(center: &Arc<Center>, report: &DeltaReport) {
    for plan in &report.distributions_to_create {
        for key_id in &plan.key_ids {
            let node = plan.node.to_string();
            if let Err(e) = start(center, *key_id, &[node.clone()]).await {
                tracing::warn!("Distribution of key {key_id} to node '{node}' failed: {e}");
            }
        }
    }
    // Revocations ride the same transport as a distribution whose
    // `content` is a retirement instruction; left to `crate::transport`
    // and `crate::krs` to interpret `revocations_to_create` on fetch.
}

/// Steps 1-4: compute (or reuse) the distribution identifier, transition
/// the key into its "in flight" state, encrypt to every not-yet-confirmed
/// recipient, persist distribution records, and NOTIFY them.
pub async fn start(center: &Arc<Center>, key_id: i64, recipients: &[String]) -> Result<Vec<DistributionRow>, KdcError> {
    let pool = &center.pool;
    let key = store::get_key(pool, key_id).await?;
    let distribution_id = crate::common::distribution_id_from_keytag(key.keytag as u16);

    let key = couple_state_forward(pool, key).await?;

    let already_confirmed = store::confirmed_nodes(pool, &distribution_id).await?;
    let pending_nodes: Vec<&String> = recipients.iter().filter(|n| !already_confirmed.contains(n)).collect();

    let now = crate::common::now();
    let expires_at = Some(now + center.config.distribution_ttl_secs as i64);

    let mut records = Vec::with_capacity(pending_nodes.len());
    for node_id in pending_nodes {
        let node = store::get_node(pool, node_id).await?;
        let record = encrypt_and_record(pool, &distribution_id, &key, &node, expires_at, now).await?;
        notify_recipient(center, &node, &distribution_id).await;
        records.push(record);
    }
    Ok(records)
}

/// Step 3: `standby -> distributed` for ZSKs, `active -> active_dist` for
/// KSKs; a no-op (treated as a retry) if the key is already in that state.
async fn couple_state_forward(pool: &SqlitePool, key: KeyRow) -> Result<KeyRow, KdcError> {
    let event = match key.key_type.as_str() {
        "zsk" => Event::Distribute,
        _ => Event::ActivateDist,
    };
    let already_in_flight = matches!(key.state.as_str(), "distributed" | "active_dist");
    if already_in_flight {
        return Ok(key);
    }
    state_machine::transition(pool, key.id, event).await
}

async fn encrypt_and_record(
    pool: &SqlitePool,
    distribution_id: &str,
    key: &KeyRow,
    node: &NodeRow,
    expires_at: Option<i64>,
    now: i64,
) -> Result<DistributionRow, KdcError> {
    let envelope = hpke::encrypt(&node.public_key, &key.private_key)?;
    let (ephemeral_pub, ciphertext) = envelope.split_at(EPHEMERAL_PUB_LEN);
    store::insert_distribution(
        pool,
        distribution_id,
        &key.zone,
        key.id,
        &node.id,
        ciphertext,
        ephemeral_pub,
        expires_at,
        now,
    )
    .await
}

async fn notify_recipient(center: &Arc<Center>, node: &NodeRow, distribution_id: &str) {
    let Some(addr) = node.notify_addr.as_deref() else {
        tracing::warn!("Node '{}' has no notify address; distribution queued but not pushed", node.id);
        return;
    };
    let qname = crate::dns::notify_qname(&center.config.control_zone, distribution_id);
    if let Err(e) = crate::dns::send_notify(addr, &qname, None).await {
        tracing::warn!("NOTIFY to '{addr}' for '{qname}' failed: {e}");
    }
}

/// Step 5: record a confirmation from `node` for `distribution_id`,
/// returning whether it was new (idempotent under retry).
pub async fn confirm(pool: &SqlitePool, distribution_id: &str, node: &str) -> Result<bool, KdcError> {
    let records = store::distributions_for_id(pool, distribution_id).await?;
    let record = records
        .iter()
        .find(|r| r.node == node)
        .ok_or_else(|| KdcError::NotFound(format!("node '{node}' has no outstanding distribution '{distribution_id}'")))?;

    let inserted = store::insert_confirmation(pool, distribution_id, &record.zone, record.key_id, node, crate::common::now()).await?;
    maybe_complete(pool, distribution_id).await?;
    Ok(inserted)
}

/// Step 6: if every pending recipient for `distribution_id` now has a
/// confirmation, mark it completed and advance the key past its "in
/// flight" state.
async fn maybe_complete(pool: &SqlitePool, distribution_id: &str) -> Result<(), KdcError> {
    let (records, confirmed) = store::distribution_state(pool, distribution_id).await?;
    if records.is_empty() {
        return Ok(());
    }
    let all_confirmed = records.iter().all(|r| confirmed.iter().any(|n| n == &r.node));
    if !all_confirmed {
        return Ok(());
    }

    let now = crate::common::now();
    store::mark_distribution_completed(pool, distribution_id, now).await?;

    let key_id = records[0].key_id;
    let key = store::get_key(pool, key_id).await?;
    let event = match (key.key_type.as_str(), key.state.as_str()) {
        ("zsk", "distributed") => Some(Event::Edgesigner),
        (_, "active_dist") => Some(Event::ActivateCe),
        _ => None,
    };
    if let Some(event) = event {
        state_machine::transition(pool, key_id, event).await?;
    }
    Ok(())
}

/// Step 7: re-run distribution for whatever recipients of `distribution_id`
/// are still unconfirmed; a no-op if everyone already confirmed.
pub async fn retry(center: &Arc<Center>, distribution_id: &str) -> Result<Vec<DistributionRow>, KdcError> {
    let pool = &center.pool;
    let pending = store::pending_recipients(pool, distribution_id).await?;
    if pending.is_empty() {
        return Ok(Vec::new());
    }
    let records = store::distributions_for_id(pool, distribution_id).await?;
    let key_id = records
        .first()
        .ok_or_else(|| KdcError::NotFound(format!("no distribution records for '{distribution_id}'")))?
        .key_id;
    start(center, key_id, &pending).await
}

/// Step 8: periodic sweep, or a forced unconditional purge. Either path
/// invalidates every manifest/chunk the removed rows could have served
/// (spec §4.7).
pub async fn gc(center: &Arc<Center>, grace_secs: i64, force: bool) -> Result<u64, KdcError> {
    let pool = &center.pool;
    if force {
        let deleted = store::purge_all_distributions(pool).await?;
        center.transport.invalidate_all().await;
        return Ok(deleted);
    }
    let older_than = crate::common::now() - grace_secs;
    let removed = store::purge_completed_distributions(pool, older_than).await?;
    for (node, distribution_id) in &removed {
        center.transport.invalidate(node, distribution_id).await;
    }
    Ok(removed.len() as u64)
}
