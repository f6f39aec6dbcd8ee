//! The membership + delta engine (spec §4.4).
//!
//! Modelled as three join tables queried with straight SQL (spec §9: "a
//! graph library is unnecessary"). Given a service and a proposed
//! `{add, remove}` component change, computes which (zone, node) pairs
//! start or stop being served, and the distribution/revocation plans that
//! follow from it.

use sqlx::SqlitePool;

use crate::catalog::store;
use crate::error::KdcError;
use signpost_api::membership::{DeltaReport, DistributionPlan, RevocationPlan, ServedPair};

/// Components carrying the signing-mode singleton.
const SIGN_PREFIX: &str = "sign_";

/// Compute the delta report for a proposed change to `service_id`'s
/// component set, without writing anything (used by both `ViewTx` and the
/// validation step inside `CommitTx`).
pub async fn compute_delta(
    pool: &SqlitePool,
    service_id: i64,
    now_components: &[String],
    add: &[String],
    remove: &[String],
) -> Result<DeltaReport, KdcError> {
    let now_set: std::collections::BTreeSet<&String> = now_components.iter().collect();
    let remove_set: std::collections::BTreeSet<&String> = remove.iter().collect();
    let add_set: std::collections::BTreeSet<&String> = add.iter().collect();

    // future(S) = (now(S) \ R) ∪ A
    let mut future: std::collections::BTreeSet<String> = now_set
        .iter()
        .filter(|c| !remove_set.contains(**c))
        .map(|c| (*c).clone())
        .collect();
    future.extend(add.iter().cloned());

    let sign_components: Vec<&String> = future.iter().filter(|c| c.starts_with(SIGN_PREFIX)).collect();
    let is_valid = sign_components.len() == 1;
    let signing_mode = sign_components.first().map(|c| (*c).clone());

    let zones = store::zones_for_service(pool, service_id).await?;

    let mut newly_served = Vec::new();
    let mut no_longer_served = Vec::new();
    let mut distributions_to_create = Vec::new();
    let mut revocations_to_create = Vec::new();

    for zone in &zones {
        let mut nodes_newly_served = Vec::new();
        let mut nodes_no_longer_served = Vec::new();

        // Every node that could plausibly be affected carries at least one
        // component touched by this change.
        let mut candidate_nodes = std::collections::BTreeSet::new();
        for component in add.iter().chain(remove.iter()) {
            for node in store::nodes_with_component(pool, component).await? {
                candidate_nodes.insert(node);
            }
        }

        for node in candidate_nodes {
            let node_components = store::list_node_components(pool, &node).await?;
            let carries: std::collections::BTreeSet<&str> =
                node_components.iter().map(|c| c.component_id.as_str()).collect();

            let carries_added = add.iter().any(|c| carries.contains(c.as_str()));
            let carries_future_minus_added =
                future.iter().any(|c| !add_set.contains(c) && carries.contains(c.as_str()));
            if carries_added && !carries_future_minus_added {
                nodes_newly_served.push(node.clone());
            }

            let carries_removed = remove.iter().any(|c| carries.contains(c.as_str()));
            let carries_future_minus_removed =
                future.iter().any(|c| !remove_set.contains(c) && carries.contains(c.as_str()));
            if carries_removed && !carries_future_minus_removed {
                nodes_no_longer_served.push(node);
            }
        }

        if !nodes_newly_served.is_empty() {
            let key_ids = distribution_key_ids(pool, &zone.name, signing_mode.as_deref()).await?;
            for node in &nodes_newly_served {
                newly_served.push(ServedPair {
                    zone: fqdn(&zone.name)?,
                    node: fqdn(node)?,
                });
            }
            if !key_ids.is_empty() {
                for node in &nodes_newly_served {
                    distributions_to_create.push(DistributionPlan {
                        zone: fqdn(&zone.name)?,
                        node: fqdn(node)?,
                        key_ids: key_ids.clone(),
                    });
                }
            }
        }

        if !nodes_no_longer_served.is_empty() {
            let key_ids = revocation_key_ids(pool, &zone.name).await?;
            for node in &nodes_no_longer_served {
                no_longer_served.push(ServedPair {
                    zone: fqdn(&zone.name)?,
                    node: fqdn(node)?,
                });
            }
            if !key_ids.is_empty() {
                for node in &nodes_no_longer_served {
                    revocations_to_create.push(RevocationPlan {
                        zone: fqdn(&zone.name)?,
                        node: fqdn(node)?,
                        key_ids: key_ids.clone(),
                    });
                }
            }
        }
    }

    let summary = format!(
        "{} zone(s) newly served, {} zone(s) no longer served, {} distribution(s) planned, {} revocation(s) planned",
        newly_served.len(),
        no_longer_served.len(),
        distributions_to_create.len(),
        revocations_to_create.len(),
    );

    Ok(DeltaReport {
        newly_served,
        no_longer_served,
        distributions_to_create,
        revocations_to_create,
        is_valid,
        summary,
    })
}

/// For zones whose signing mode plans distributions: all ZSKs currently in
/// `standby`, plus, under `edge_full`, the single KSK in `active`.
async fn distribution_key_ids(pool: &SqlitePool, zone: &str, signing_mode: Option<&str>) -> Result<Vec<i64>, KdcError> {
    let mode = match signing_mode {
        Some(m) => m,
        None => return Ok(Vec::new()),
    };
    if !matches!(mode, "sign_edge_dyn" | "sign_edge_zsk" | "sign_edge_full") {
        return Ok(Vec::new());
    }

    let mut key_ids: Vec<i64> = store::keys_in_state(pool, zone, "zsk", "standby")
        .await?
        .into_iter()
        .map(|k| k.id)
        .collect();

    if mode == "sign_edge_full" {
        key_ids.extend(store::keys_in_state(pool, zone, "ksk", "active").await?.into_iter().map(|k| k.id));
    }

    Ok(key_ids)
}

/// Distributed ZSKs (`distributed`/`edgesigner`) and `active_dist` KSKs —
/// what a no-longer-served node should have revoked.
async fn revocation_key_ids(pool: &SqlitePool, zone: &str) -> Result<Vec<i64>, KdcError> {
    let mut key_ids = Vec::new();
    for state in ["distributed", "edgesigner"] {
        key_ids.extend(store::keys_in_state(pool, zone, "zsk", state).await?.into_iter().map(|k| k.id));
    }
    key_ids.extend(store::keys_in_state(pool, zone, "ksk", "active_dist").await?.into_iter().map(|k| k.id));
    Ok(key_ids)
}

fn fqdn(name: &str) -> Result<domain::base::Name<bytes::Bytes>, KdcError> {
    use std::str::FromStr;
    domain::base::Name::from_str(name).map_err(|_| KdcError::Validation(format!("invalid FQDN stored in catalog: '{name}'")))
}
