//! End-to-end scenario tests (spec §8): S1-S6, against a real (temp-file)
//! SQLite catalog. S7 (manifest inline vs. chunked) and S8 (freshness
//! rejection) are covered by the pure-function unit tests in
//! `src/transport.rs` and `src/krs/receiver.rs`, since both are plain
//! synchronous checks that don't need a database.

mod support;

use base64::Engine;
use signpost::catalog::store;
use signpost::crypto::keygen;
use signpost::{common, distribution, membership, state_machine};
use signpost_api::Algorithm;

async fn zone_with_key(center: &std::sync::Arc<signpost::center::Center>, zone: &str, service_id: Option<i64>) -> signpost::catalog::KeyRow {
    let pool = &center.pool;
    let now = common::now();
    store::create_zone(pool, zone, service_id, now).await.unwrap();
    let generated = keygen::generate(Algorithm::Ed25519, 256).unwrap();
    let distribution_id = common::distribution_id_from_keytag(generated.keytag);
    let public_key_b64 = base64::engine::general_purpose::STANDARD.encode(&generated.public_key);
    store::insert_key(
        pool,
        zone,
        "zsk",
        generated.keytag as i64,
        &distribution_id,
        "Ed25519",
        256,
        &public_key_b64,
        &generated.pkcs8,
        now,
    )
    .await
    .unwrap()
}

async fn node(center: &std::sync::Arc<signpost::center::Center>, id: &str) -> signpost::catalog::NodeRow {
    let keypair = signpost::crypto::hpke::generate_keypair().unwrap();
    store::create_node(&center.pool, id, &keypair.public_key, None, common::now())
        .await
        .unwrap()
}

/// S1: generate and activate a ZSK through created -> published -> standby.
#[tokio::test]
async fn s1_generate_and_activate_zsk() {
    let center = support::center().await;
    let key = zone_with_key(&center, "example.test.", None).await;
    assert_eq!(key.state, "created");

    let key = state_machine::transition(&center.pool, key.id, state_machine::Event::Publish).await.unwrap();
    assert_eq!(key.state, "published");
    assert!(key.published_at.is_some());
    assert!(key.activated_at.is_none());

    let key = state_machine::transition(&center.pool, key.id, state_machine::Event::Standby).await.unwrap();
    assert_eq!(key.state, "standby");
    assert!(key.activated_at.is_none());
}

/// S2: first distribution to a single node, followed by its confirmation.
#[tokio::test]
async fn s2_first_distribution_completes_on_confirmation() {
    let center = support::center().await;
    let service = store::create_service(&center.pool, "edge-signers", common::now()).await.unwrap();
    store::assign_service_component(&center.pool, service.id, "sign_edge_zsk", common::now()).await.unwrap();

    let key = zone_with_key(&center, "example.test.", Some(service.id)).await;
    let n = node(&center, "n1.example.test.").await;
    store::assign_node_component(&center.pool, &n.id, "sign_edge_zsk", common::now()).await.unwrap();

    let records = distribution::start(&center, key.id, &[n.id.clone()]).await.unwrap();
    assert_eq!(records.len(), 1);
    let distribution_id = records[0].distribution_id.clone();

    let key = store::get_key(&center.pool, key.id).await.unwrap();
    assert_eq!(key.state, "distributed");

    let newly_inserted = distribution::confirm(&center.pool, &distribution_id, &n.id).await.unwrap();
    assert!(newly_inserted);

    let key = store::get_key(&center.pool, key.id).await.unwrap();
    assert_eq!(key.state, "edgesigner");

    let (all_records, confirmed) = store::distribution_state(&center.pool, &distribution_id).await.unwrap();
    assert!(all_records.iter().all(|r| r.status == "completed"));
    assert!(all_records.iter().all(|r| r.completed_at.is_some()));
    assert_eq!(confirmed, vec![n.id.clone()]);
}

/// S3: retrying distribution after everyone has confirmed is a no-op.
#[tokio::test]
async fn s3_retry_after_full_confirmation_is_a_noop() {
    let center = support::center().await;
    let key = zone_with_key(&center, "example.test.", None).await;
    let n = node(&center, "n1.example.test.").await;

    let records = distribution::start(&center, key.id, &[n.id.clone()]).await.unwrap();
    let distribution_id = records[0].distribution_id.clone();
    distribution::confirm(&center.pool, &distribution_id, &n.id).await.unwrap();

    let retried = distribution::retry(&center, &distribution_id).await.unwrap();
    assert!(retried.is_empty(), "a fully confirmed distribution should produce no new recipients");
}

/// S4: adding a second node to an already-served service, via a
/// transaction, distributes only to the newly added node.
#[tokio::test]
async fn s4_partial_retry_targets_only_the_new_node() {
    let center = support::center().await;
    let service = store::create_service(&center.pool, "edge-signers", common::now()).await.unwrap();
    store::assign_service_component(&center.pool, service.id, "sign_edge_zsk", common::now()).await.unwrap();

    let key = zone_with_key(&center, "example.test.", Some(service.id)).await;
    let n1 = node(&center, "n1.example.test.").await;
    store::assign_node_component(&center.pool, &n1.id, "sign_edge_zsk", common::now()).await.unwrap();

    let records = distribution::start(&center, key.id, &[n1.id.clone()]).await.unwrap();
    let distribution_id = records[0].distribution_id.clone();
    distribution::confirm(&center.pool, &distribution_id, &n1.id).await.unwrap();

    let n2 = node(&center, "n2.example.test.").await;
    store::assign_node_component(&center.pool, &n2.id, "sign_edge_zsk", common::now()).await.unwrap();

    let recipients = store::nodes_serving_zone(&center.pool, "example.test.").await.unwrap().into_iter().map(|n| n.id).collect::<Vec<_>>();
    assert!(recipients.contains(&n1.id));
    assert!(recipients.contains(&n2.id));

    let records = distribution::start(&center, key.id, &recipients).await.unwrap();
    let targeted: Vec<&str> = records.iter().map(|r| r.node.as_str()).collect();
    assert_eq!(targeted, vec![n2.id.as_str()], "n1 already confirmed and should not be re-targeted");
}

/// S5: a transaction that removes the sole sign_* component without
/// supplying a replacement is invalid; one that swaps it for another
/// sign_* component is valid.
#[tokio::test]
async fn s5_removal_without_replacement_is_invalid() {
    let center = support::center().await;
    let service = store::create_service(&center.pool, "edge-signers", common::now()).await.unwrap();
    store::assign_service_component(&center.pool, service.id, "sign_edge_zsk", common::now()).await.unwrap();

    let report = membership::compute_delta(&center.pool, service.id, &["sign_edge_zsk".to_string()], &[], &["sign_edge_zsk".to_string()]).await.unwrap();
    assert!(!report.is_valid, "removing the only sign_* component with no replacement must be invalid");

    let report = membership::compute_delta(
        &center.pool,
        service.id,
        &["sign_edge_zsk".to_string()],
        &["sign_kdc".to_string()],
        &["sign_edge_zsk".to_string()],
    )
    .await
    .unwrap();
    assert!(report.is_valid, "swapping one sign_* component for another must remain valid");
}

/// S6: after a distribution completes, GC past its grace period deletes
/// the completed record; GC before the grace period leaves it alone.
#[tokio::test]
async fn s6_gc_removes_completed_distributions_past_grace() {
    let center = support::center().await;
    let key = zone_with_key(&center, "example.test.", None).await;
    let n = node(&center, "n1.example.test.").await;

    let records = distribution::start(&center, key.id, &[n.id.clone()]).await.unwrap();
    let distribution_id = records[0].distribution_id.clone();
    distribution::confirm(&center.pool, &distribution_id, &n.id).await.unwrap();

    // Nothing to collect yet: the record is fresh.
    let purged = distribution::gc(&center, 3600, false).await.unwrap();
    assert_eq!(purged, 0);

    // Backdate completion past an immediate grace window and sweep again.
    sqlx::query("UPDATE distributions SET completed_at = ? WHERE distribution_id = ?")
        .bind(common::now() - 10)
        .bind(&distribution_id)
        .execute(&center.pool)
        .await
        .unwrap();

    let purged = distribution::gc(&center, 1, false).await.unwrap();
    assert_eq!(purged, 1);

    let remaining = store::distributions_for_id(&center.pool, &distribution_id).await.unwrap();
    assert!(remaining.is_empty());
}

/// GC must not just drop the catalog row; it has to invalidate whatever
/// the manifest cache holds for the same (node, distribution_id), or a
/// purged distribution would still be servable from memory (spec §4.7).
#[tokio::test]
async fn s6_gc_invalidates_the_transport_cache() {
    let center = support::center().await;
    let key = zone_with_key(&center, "example.test.", None).await;
    let n = node(&center, "n1.example.test.").await;

    let records = distribution::start(&center, key.id, &[n.id.clone()]).await.unwrap();
    let distribution_id = records[0].distribution_id.clone();
    distribution::confirm(&center.pool, &distribution_id, &n.id).await.unwrap();

    let control = center.control_params();
    center.transport.manifest(&center.pool, &n.id, &distribution_id, &control).await.unwrap();

    sqlx::query("UPDATE distributions SET completed_at = ? WHERE distribution_id = ?")
        .bind(common::now() - 10)
        .bind(&distribution_id)
        .execute(&center.pool)
        .await
        .unwrap();

    distribution::gc(&center, 1, false).await.unwrap();

    let err = center.transport.manifest(&center.pool, &n.id, &distribution_id, &control).await.unwrap_err();
    assert!(matches!(err, signpost::error::KdcError::NotFound(_)));
}

/// Invariant 3: at most one confirmation per (distribution id, node).
#[tokio::test]
async fn invariant_confirmation_uniqueness() {
    let center = support::center().await;
    let key = zone_with_key(&center, "example.test.", None).await;
    let n = node(&center, "n1.example.test.").await;

    let records = distribution::start(&center, key.id, &[n.id.clone()]).await.unwrap();
    let distribution_id = records[0].distribution_id.clone();

    let first = distribution::confirm(&center.pool, &distribution_id, &n.id).await.unwrap();
    let second = distribution::confirm(&center.pool, &distribution_id, &n.id).await.unwrap();
    assert!(first);
    assert!(!second, "a repeat confirmation must not be treated as new");

    let confirmed = store::confirmed_nodes(&center.pool, &distribution_id).await.unwrap();
    assert_eq!(confirmed.iter().filter(|c| *c == &n.id).count(), 1);
}

/// Invariant: retrying a distribution that a node has not yet confirmed
/// must refresh its existing pending row, not pile up a second one.
#[tokio::test]
async fn invariant_retry_does_not_duplicate_a_pending_row() {
    let center = support::center().await;
    let key = zone_with_key(&center, "example.test.", None).await;
    let n = node(&center, "n1.example.test.").await;

    let records = distribution::start(&center, key.id, &[n.id.clone()]).await.unwrap();
    let distribution_id = records[0].distribution_id.clone();

    distribution::retry(&center, &distribution_id).await.unwrap();
    distribution::retry(&center, &distribution_id).await.unwrap();

    let rows = store::distributions_for_id(&center.pool, &distribution_id).await.unwrap();
    assert_eq!(rows.iter().filter(|r| r.node == n.id).count(), 1, "a still-pending node must keep a single distribution row across retries");
}

/// Invariant 2: every distribution record for a key shares its
/// distribution id across repeated `start` calls for the same key.
#[tokio::test]
async fn invariant_distribution_id_is_stable_across_retries() {
    let center = support::center().await;
    let key = zone_with_key(&center, "example.test.", None).await;
    let n1 = node(&center, "n1.example.test.").await;
    let n2 = node(&center, "n2.example.test.").await;

    let first = distribution::start(&center, key.id, &[n1.id.clone()]).await.unwrap();
    let second = distribution::start(&center, key.id, &[n2.id.clone()]).await.unwrap();

    assert_eq!(first[0].distribution_id, second[0].distribution_id);
}
