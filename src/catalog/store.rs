//! Plain SQL queries against the catalog schema.
//!
//! Every function takes an `&SqlitePool` (or an open `Transaction`, for the
//! handful of multi-row invariants spec §9 calls out) and returns
//! [`KdcError`]; callers in [`crate::http`], [`crate::membership`], and
//! [`crate::state_machine`] build higher-level behaviour on top.

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::catalog::models::*;
use crate::error::KdcError;

pub type Tx<'a> = Transaction<'a, Sqlite>;

//----------- services ---------------------------------------------------------

pub async fn create_service(pool: &SqlitePool, name: &str, now: i64) -> Result<ServiceRow, KdcError> {
    let id = sqlx::query("INSERT INTO services (name, active, created_at, updated_at) VALUES (?, 1, ?, ?)")
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| map_insert_error(e, "a service with this name already exists"))?
        .last_insert_rowid();
    get_service(pool, id).await
}

pub async fn get_service(pool: &SqlitePool, id: i64) -> Result<ServiceRow, KdcError> {
    sqlx::query_as("SELECT * FROM services WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no service with id {id}")))
}

pub async fn list_services(pool: &SqlitePool) -> Result<Vec<ServiceRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM services ORDER BY id").fetch_all(pool).await?)
}

pub async fn update_service(pool: &SqlitePool, id: i64, name: Option<&str>, active: Option<bool>, now: i64) -> Result<ServiceRow, KdcError> {
    let current = get_service(pool, id).await?;
    let name = name.unwrap_or(&current.name);
    let active = active.unwrap_or(current.active);
    sqlx::query("UPDATE services SET name = ?, active = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(active)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    get_service(pool, id).await
}

pub async fn delete_service(pool: &SqlitePool, id: i64) -> Result<(), KdcError> {
    let result = sqlx::query("DELETE FROM services WHERE id = ?").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(KdcError::NotFound(format!("no service with id {id}")));
    }
    Ok(())
}

//----------- components --------------------------------------------------------

pub async fn create_component(pool: &SqlitePool, id: &str, name: &str, system: bool, now: i64) -> Result<ComponentRow, KdcError> {
    sqlx::query("INSERT INTO components (id, name, active, system, created_at, updated_at) VALUES (?, ?, 1, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(system)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| map_insert_error(e, "a component with this id already exists"))?;
    get_component(pool, id).await
}

pub async fn get_component(pool: &SqlitePool, id: &str) -> Result<ComponentRow, KdcError> {
    sqlx::query_as("SELECT * FROM components WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no component '{id}'")))
}

pub async fn list_components(pool: &SqlitePool) -> Result<Vec<ComponentRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM components ORDER BY id").fetch_all(pool).await?)
}

pub async fn update_component(pool: &SqlitePool, id: &str, name: Option<&str>, active: Option<bool>, now: i64) -> Result<ComponentRow, KdcError> {
    let current = get_component(pool, id).await?;
    let name = name.unwrap_or(&current.name);
    let active = active.unwrap_or(current.active);
    sqlx::query("UPDATE components SET name = ?, active = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(active)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    get_component(pool, id).await
}

pub async fn delete_component(pool: &SqlitePool, id: &str) -> Result<(), KdcError> {
    let component = get_component(pool, id).await?;
    if component.system {
        return Err(KdcError::Validation(format!("component '{id}' is system-defined and cannot be deleted")));
    }
    sqlx::query("DELETE FROM components WHERE id = ?").bind(id).execute(pool).await?;
    Ok(())
}

//----------- zones --------------------------------------------------------------

pub async fn create_zone(pool: &SqlitePool, name: &str, service_id: Option<i64>, now: i64) -> Result<ZoneRow, KdcError> {
    sqlx::query("INSERT INTO zones (name, active, service_id, created_at, updated_at) VALUES (?, 1, ?, ?, ?)")
        .bind(name)
        .bind(service_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| map_insert_error(e, "a zone with this name already exists"))?;
    get_zone(pool, name).await
}

pub async fn get_zone(pool: &SqlitePool, name: &str) -> Result<ZoneRow, KdcError> {
    sqlx::query_as("SELECT * FROM zones WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no zone '{name}'")))
}

pub async fn list_zones(pool: &SqlitePool) -> Result<Vec<ZoneRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM zones ORDER BY name").fetch_all(pool).await?)
}

pub async fn update_zone(pool: &SqlitePool, name: &str, active: Option<bool>, now: i64) -> Result<ZoneRow, KdcError> {
    let current = get_zone(pool, name).await?;
    let active = active.unwrap_or(current.active);
    sqlx::query("UPDATE zones SET active = ?, updated_at = ? WHERE name = ?")
        .bind(active)
        .bind(now)
        .bind(name)
        .execute(pool)
        .await?;
    get_zone(pool, name).await
}

pub async fn set_zone_service(pool: &SqlitePool, name: &str, service_id: Option<i64>, now: i64) -> Result<ZoneRow, KdcError> {
    get_zone(pool, name).await?;
    sqlx::query("UPDATE zones SET service_id = ?, updated_at = ? WHERE name = ?")
        .bind(service_id)
        .bind(now)
        .bind(name)
        .execute(pool)
        .await?;
    get_zone(pool, name).await
}

pub async fn delete_zone(pool: &SqlitePool, name: &str) -> Result<(), KdcError> {
    let result = sqlx::query("DELETE FROM zones WHERE name = ?").bind(name).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(KdcError::NotFound(format!("no zone '{name}'")));
    }
    Ok(())
}

/// Zones belonging to `service_id`, or the default service when `None`.
pub async fn zones_for_service(pool: &SqlitePool, service_id: i64) -> Result<Vec<ZoneRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM zones WHERE service_id = ? ORDER BY name")
        .bind(service_id)
        .fetch_all(pool)
        .await?)
}

//----------- nodes ---------------------------------------------------------------

pub async fn create_node(pool: &SqlitePool, id: &str, public_key: &[u8], notify_addr: Option<&str>, now: i64) -> Result<NodeRow, KdcError> {
    sqlx::query(
        "INSERT INTO nodes (id, public_key, notify_addr, state, created_at, updated_at) VALUES (?, ?, ?, 'offline', ?, ?)",
    )
    .bind(id)
    .bind(public_key)
    .bind(notify_addr)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| map_insert_error(e, "a node with this id or public key already exists"))?;
    get_node(pool, id).await
}

pub async fn get_node(pool: &SqlitePool, id: &str) -> Result<NodeRow, KdcError> {
    sqlx::query_as("SELECT * FROM nodes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no node '{id}'")))
}

pub async fn list_nodes(pool: &SqlitePool) -> Result<Vec<NodeRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM nodes ORDER BY id").fetch_all(pool).await?)
}

pub async fn update_node(pool: &SqlitePool, id: &str, notify_addr: Option<&str>, now: i64) -> Result<NodeRow, KdcError> {
    get_node(pool, id).await?;
    sqlx::query("UPDATE nodes SET notify_addr = ?, updated_at = ? WHERE id = ?")
        .bind(notify_addr)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    get_node(pool, id).await
}

pub async fn set_node_state(pool: &SqlitePool, id: &str, state: &str, now: i64) -> Result<NodeRow, KdcError> {
    get_node(pool, id).await?;
    sqlx::query("UPDATE nodes SET state = ?, updated_at = ? WHERE id = ?")
        .bind(state)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    get_node(pool, id).await
}

pub async fn touch_node_last_seen(pool: &SqlitePool, id: &str, now: i64) -> Result<(), KdcError> {
    sqlx::query("UPDATE nodes SET last_seen = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_node(pool: &SqlitePool, id: &str) -> Result<(), KdcError> {
    let result = sqlx::query("DELETE FROM nodes WHERE id = ?").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(KdcError::NotFound(format!("no node '{id}'")));
    }
    Ok(())
}

/// Nodes currently serving `zone`, per the membership join (spec §4.4): a
/// node shares at least one active component with the zone's service.
pub async fn nodes_serving_zone(pool: &SqlitePool, zone: &str) -> Result<Vec<NodeRow>, KdcError> {
    Ok(sqlx::query_as(
        "SELECT DISTINCT n.* FROM nodes n \
         JOIN node_components nc ON nc.node_id = n.id AND nc.active = 1 \
         JOIN service_components sc ON sc.component_id = nc.component_id AND sc.active = 1 \
         JOIN zones z ON z.service_id = sc.service_id \
         WHERE z.name = ? \
         ORDER BY n.id",
    )
    .bind(zone)
    .fetch_all(pool)
    .await?)
}

//----------- service/node component assignments -----------------------------------

pub async fn assign_service_component(pool: &SqlitePool, service_id: i64, component_id: &str, now: i64) -> Result<(), KdcError> {
    sqlx::query(
        "INSERT INTO service_components (service_id, component_id, active, since) VALUES (?, ?, 1, ?) \
         ON CONFLICT (service_id, component_id) DO UPDATE SET active = 1, since = excluded.since",
    )
    .bind(service_id)
    .bind(component_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unassign_service_component(pool: &SqlitePool, service_id: i64, component_id: &str) -> Result<(), KdcError> {
    sqlx::query("DELETE FROM service_components WHERE service_id = ? AND component_id = ?")
        .bind(service_id)
        .bind(component_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_service_components(pool: &SqlitePool, service_id: i64) -> Result<Vec<ServiceComponentRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM service_components WHERE service_id = ? AND active = 1")
        .bind(service_id)
        .fetch_all(pool)
        .await?)
}

/// Replace the full active component set of a service atomically.
pub async fn replace_service_components(tx: &mut Tx<'_>, service_id: i64, component_ids: &[String], now: i64) -> Result<(), KdcError> {
    sqlx::query("DELETE FROM service_components WHERE service_id = ?")
        .bind(service_id)
        .execute(&mut **tx)
        .await?;
    for component_id in component_ids {
        sqlx::query("INSERT INTO service_components (service_id, component_id, active, since) VALUES (?, ?, 1, ?)")
            .bind(service_id)
            .bind(component_id)
            .bind(now)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

pub async fn assign_node_component(pool: &SqlitePool, node_id: &str, component_id: &str, now: i64) -> Result<(), KdcError> {
    sqlx::query(
        "INSERT INTO node_components (node_id, component_id, active, since) VALUES (?, ?, 1, ?) \
         ON CONFLICT (node_id, component_id) DO UPDATE SET active = 1, since = excluded.since",
    )
    .bind(node_id)
    .bind(component_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unassign_node_component(pool: &SqlitePool, node_id: &str, component_id: &str) -> Result<(), KdcError> {
    sqlx::query("DELETE FROM node_components WHERE node_id = ? AND component_id = ?")
        .bind(node_id)
        .bind(component_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_node_components(pool: &SqlitePool, node_id: &str) -> Result<Vec<NodeComponentRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM node_components WHERE node_id = ? AND active = 1")
        .bind(node_id)
        .fetch_all(pool)
        .await?)
}

/// Every node carrying `component_id`, active.
pub async fn nodes_with_component(pool: &SqlitePool, component_id: &str) -> Result<Vec<String>, KdcError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT node_id FROM node_components WHERE component_id = ? AND active = 1",
    )
    .bind(component_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

//----------- keys ------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub async fn insert_key(
    pool: &SqlitePool,
    zone: &str,
    key_type: &str,
    keytag: i64,
    distribution_id: &str,
    algorithm: &str,
    flags: i64,
    public_key: &str,
    private_key: &[u8],
    now: i64,
) -> Result<KeyRow, KdcError> {
    let id = sqlx::query(
        "INSERT INTO keys (zone, key_type, keytag, distribution_id, algorithm, flags, public_key, private_key, state, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'created', ?)",
    )
    .bind(zone)
    .bind(key_type)
    .bind(keytag)
    .bind(distribution_id)
    .bind(algorithm)
    .bind(flags)
    .bind(public_key)
    .bind(private_key)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();
    get_key(pool, id).await
}

pub async fn get_key(pool: &SqlitePool, id: i64) -> Result<KeyRow, KdcError> {
    sqlx::query_as("SELECT * FROM keys WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no key with id {id}")))
}

pub async fn list_keys_for_zone(pool: &SqlitePool, zone: &str) -> Result<Vec<KeyRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM keys WHERE zone = ? ORDER BY id")
        .bind(zone)
        .fetch_all(pool)
        .await?)
}

pub async fn keys_in_state(pool: &SqlitePool, zone: &str, key_type: &str, state: &str) -> Result<Vec<KeyRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM keys WHERE zone = ? AND key_type = ? AND state = ? ORDER BY id")
        .bind(zone)
        .bind(key_type)
        .bind(state)
        .fetch_all(pool)
        .await?)
}

/// Set a key's state, stamping the appropriate timestamp and overwriting
/// `comment` with a fresh one-line audit note (spec §4.3: replace, never
/// append).
pub async fn set_key_state(pool: &SqlitePool, id: i64, state: &str, comment: &str, now: i64) -> Result<KeyRow, KdcError> {
    let timestamp_column = match state {
        "published" => Some("published_at"),
        "active" | "active_dist" | "active_ce" | "distributed" | "edgesigner" => Some("activated_at"),
        "retired" => Some("retired_at"),
        _ => None,
    };
    match timestamp_column {
        Some(column) => {
            let sql = format!("UPDATE keys SET state = ?, comment = ?, {column} = ? WHERE id = ?");
            sqlx::query(&sql).bind(state).bind(comment).bind(now).bind(id).execute(pool).await?;
        }
        None => {
            sqlx::query("UPDATE keys SET state = ?, comment = ? WHERE id = ?")
                .bind(state)
                .bind(comment)
                .bind(id)
                .execute(pool)
                .await?;
        }
    }
    get_key(pool, id).await
}

pub async fn delete_key(pool: &SqlitePool, id: i64) -> Result<(), KdcError> {
    let result = sqlx::query("DELETE FROM keys WHERE id = ?").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(KdcError::NotFound(format!("no key with id {id}")));
    }
    Ok(())
}

pub async fn purge_removed_keys(pool: &SqlitePool) -> Result<u64, KdcError> {
    Ok(sqlx::query("DELETE FROM keys WHERE state = 'removed'").execute(pool).await?.rows_affected())
}

//----------- distributions -----------------------------------------------------------

/// Upsert keyed on the partial unique index over `(zone, key_id, node)
/// WHERE status = 'pending'` (spec §3): a node that already has an
/// outstanding pending distribution for this key gets its ciphertext and
/// expiry refreshed in place rather than a second row.
#[allow(clippy::too_many_arguments)]
pub async fn insert_distribution(
    pool: &SqlitePool,
    distribution_id: &str,
    zone: &str,
    key_id: i64,
    node: &str,
    ciphertext: &[u8],
    ephemeral_pub: &[u8],
    expires_at: Option<i64>,
    now: i64,
) -> Result<DistributionRow, KdcError> {
    sqlx::query(
        "INSERT INTO distributions (distribution_id, zone, key_id, node, ciphertext, ephemeral_pub, status, created_at, expires_at) \
         VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?) \
         ON CONFLICT (zone, key_id, node) WHERE status = 'pending' DO UPDATE SET \
             distribution_id = excluded.distribution_id, \
             ciphertext = excluded.ciphertext, \
             ephemeral_pub = excluded.ephemeral_pub, \
             created_at = excluded.created_at, \
             expires_at = excluded.expires_at",
    )
    .bind(distribution_id)
    .bind(zone)
    .bind(key_id)
    .bind(node)
    .bind(ciphertext)
    .bind(ephemeral_pub)
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;
    get_pending_distribution(pool, zone, key_id, node).await
}

async fn get_pending_distribution(pool: &SqlitePool, zone: &str, key_id: i64, node: &str) -> Result<DistributionRow, KdcError> {
    sqlx::query_as("SELECT * FROM distributions WHERE zone = ? AND key_id = ? AND node = ? AND status = 'pending'")
        .bind(zone)
        .bind(key_id)
        .bind(node)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no pending distribution for zone '{zone}', key {key_id}, node '{node}'")))
}

pub async fn get_distribution(pool: &SqlitePool, id: i64) -> Result<DistributionRow, KdcError> {
    sqlx::query_as("SELECT * FROM distributions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no distribution record {id}")))
}

pub async fn distributions_for_id(pool: &SqlitePool, distribution_id: &str) -> Result<Vec<DistributionRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM distributions WHERE distribution_id = ? ORDER BY id")
        .bind(distribution_id)
        .fetch_all(pool)
        .await?)
}

pub async fn pending_recipients(pool: &SqlitePool, distribution_id: &str) -> Result<Vec<String>, KdcError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT node FROM distributions WHERE distribution_id = ? AND status = 'pending'",
    )
    .bind(distribution_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(n,)| n).collect())
}

pub async fn list_distributions(pool: &SqlitePool) -> Result<Vec<DistributionRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM distributions ORDER BY id").fetch_all(pool).await?)
}

pub async fn mark_distribution_completed(pool: &SqlitePool, distribution_id: &str, now: i64) -> Result<(), KdcError> {
    sqlx::query("UPDATE distributions SET status = 'completed', completed_at = ? WHERE distribution_id = ?")
        .bind(now)
        .bind(distribution_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_confirmation(pool: &SqlitePool, distribution_id: &str, zone: &str, key_id: i64, node: &str, now: i64) -> Result<bool, KdcError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO confirmations (distribution_id, zone, key_id, node, confirmed_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(distribution_id)
    .bind(zone)
    .bind(key_id)
    .bind(node)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn confirmed_nodes(pool: &SqlitePool, distribution_id: &str) -> Result<Vec<String>, KdcError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT node FROM confirmations WHERE distribution_id = ?")
        .bind(distribution_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(n,)| n).collect())
}

pub async fn distribution_state(pool: &SqlitePool, distribution_id: &str) -> Result<(Vec<DistributionRow>, Vec<String>), KdcError> {
    let records = distributions_for_id(pool, distribution_id).await?;
    let confirmed = confirmed_nodes(pool, distribution_id).await?;
    Ok((records, confirmed))
}

/// Sweeps completed distributions past `older_than`, returning every
/// `(node, distribution_id)` pair it deleted so the caller can invalidate
/// `crate::transport::Cache` entries that would otherwise serve a manifest
/// for a row that no longer exists (spec §4.7).
pub async fn purge_completed_distributions(pool: &SqlitePool, older_than: i64) -> Result<Vec<(String, String)>, KdcError> {
    let mut tx = pool.begin().await?;
    let ids: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT distribution_id FROM distributions WHERE status = 'completed' AND completed_at < ?",
    )
    .bind(older_than)
    .fetch_all(&mut *tx)
    .await?;

    let mut removed = Vec::new();
    for (distribution_id,) in ids {
        let nodes: Vec<(String,)> = sqlx::query_as("SELECT node FROM distributions WHERE distribution_id = ? AND status = 'completed'")
            .bind(&distribution_id)
            .fetch_all(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM distributions WHERE distribution_id = ? AND status = 'completed'")
            .bind(&distribution_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM confirmations WHERE distribution_id = ?")
            .bind(&distribution_id)
            .execute(&mut *tx)
            .await?;
        removed.extend(nodes.into_iter().map(|(node,)| (node, distribution_id.clone())));
    }

    // Orphan confirmations: no distribution record references them at all.
    sqlx::query(
        "DELETE FROM confirmations WHERE distribution_id NOT IN (SELECT DISTINCT distribution_id FROM distributions)",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(removed)
}

pub async fn purge_all_distributions(pool: &SqlitePool) -> Result<u64, KdcError> {
    let mut tx = pool.begin().await?;
    let deleted = sqlx::query("DELETE FROM distributions").execute(&mut *tx).await?.rows_affected();
    sqlx::query("DELETE FROM confirmations").execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(deleted)
}

//----------- service transactions -----------------------------------------------------

pub async fn insert_transaction(
    pool: &SqlitePool,
    id: &str,
    service_id: i64,
    snapshot_json: &str,
    author: Option<&str>,
    comment: Option<&str>,
    now: i64,
    expires_at: i64,
) -> Result<ServiceTransactionRow, KdcError> {
    sqlx::query(
        "INSERT INTO service_transactions (id, service_id, state, created_at, expires_at, snapshot, author, comment) \
         VALUES (?, ?, 'open', ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(service_id)
    .bind(now)
    .bind(expires_at)
    .bind(snapshot_json)
    .bind(author)
    .bind(comment)
    .execute(pool)
    .await?;
    get_transaction(pool, id).await
}

pub async fn get_transaction(pool: &SqlitePool, id: &str) -> Result<ServiceTransactionRow, KdcError> {
    sqlx::query_as("SELECT * FROM service_transactions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no transaction '{id}'")))
}

pub async fn list_transactions(pool: &SqlitePool, service_id: Option<i64>) -> Result<Vec<ServiceTransactionRow>, KdcError> {
    match service_id {
        Some(service_id) => Ok(sqlx::query_as("SELECT * FROM service_transactions WHERE service_id = ? ORDER BY created_at DESC")
            .bind(service_id)
            .fetch_all(pool)
            .await?),
        None => Ok(sqlx::query_as("SELECT * FROM service_transactions ORDER BY created_at DESC").fetch_all(pool).await?),
    }
}

pub async fn update_transaction_changes(pool: &SqlitePool, id: &str, add_components: &str, remove_components: &str) -> Result<(), KdcError> {
    sqlx::query("UPDATE service_transactions SET add_components = ?, remove_components = ? WHERE id = ?")
        .bind(add_components)
        .bind(remove_components)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_transaction_state(pool: &SqlitePool, id: &str, state: &str) -> Result<(), KdcError> {
    sqlx::query("UPDATE service_transactions SET state = ? WHERE id = ?")
        .bind(state)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn expire_transactions(pool: &SqlitePool, now: i64) -> Result<u64, KdcError> {
    Ok(sqlx::query("UPDATE service_transactions SET state = 'rolled_back' WHERE state = 'open' AND expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?
        .rows_affected())
}

//----------- KRS-side: node identity and installed keys --------------------------------

pub async fn get_node_identity(pool: &SqlitePool) -> Result<Option<NodeIdentityRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM node_identity WHERE id = 1").fetch_optional(pool).await?)
}

pub async fn set_node_identity(pool: &SqlitePool, node_id: &str, public_key: &[u8], private_key: &[u8]) -> Result<NodeIdentityRow, KdcError> {
    sqlx::query(
        "INSERT INTO node_identity (id, node_id, public_key, private_key) VALUES (1, ?, ?, ?) \
         ON CONFLICT (id) DO UPDATE SET node_id = excluded.node_id, public_key = excluded.public_key, private_key = excluded.private_key",
    )
    .bind(node_id)
    .bind(public_key)
    .bind(private_key)
    .execute(pool)
    .await?;
    Ok(get_node_identity(pool).await?.expect("just inserted"))
}

#[allow(clippy::too_many_arguments)]
pub async fn install_key(
    pool: &SqlitePool,
    zone: &str,
    key_type: &str,
    keytag: i64,
    distribution_id: &str,
    algorithm: &str,
    public_key: &str,
    private_key: &[u8],
    state: &str,
    retire_time_secs: i64,
    now: i64,
) -> Result<InstalledKeyRow, KdcError> {
    sqlx::query(
        "INSERT INTO installed_keys \
         (zone, key_type, keytag, distribution_id, algorithm, public_key, private_key, state, installed_at, retire_time_secs) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (zone, key_type, distribution_id) DO UPDATE SET \
             public_key = excluded.public_key, private_key = excluded.private_key, \
             state = excluded.state, installed_at = excluded.installed_at",
    )
    .bind(zone)
    .bind(key_type)
    .bind(keytag)
    .bind(distribution_id)
    .bind(algorithm)
    .bind(public_key)
    .bind(private_key)
    .bind(state)
    .bind(now)
    .bind(retire_time_secs)
    .execute(pool)
    .await?;

    sqlx::query_as("SELECT * FROM installed_keys WHERE zone = ? AND key_type = ? AND distribution_id = ?")
        .bind(zone)
        .bind(key_type)
        .bind(distribution_id)
        .fetch_one(pool)
        .await
        .map_err(KdcError::from)
}

/// Retire any prior installed key of the same (zone, key_type) in the
/// corresponding hot state, excluding `keep_id` (spec §4.8 step 6).
pub async fn retire_other_installed_keys(pool: &SqlitePool, zone: &str, key_type: &str, hot_state: &str, keep_id: i64, now: i64) -> Result<(), KdcError> {
    sqlx::query(
        "UPDATE installed_keys SET state = 'retired', retired_at = ? \
         WHERE zone = ? AND key_type = ? AND state = ? AND id != ?",
    )
    .bind(now)
    .bind(zone)
    .bind(key_type)
    .bind(hot_state)
    .bind(keep_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_installed_keys(pool: &SqlitePool) -> Result<Vec<InstalledKeyRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM installed_keys ORDER BY id").fetch_all(pool).await?)
}

pub async fn installed_keys_for_zone(pool: &SqlitePool, zone: &str) -> Result<Vec<InstalledKeyRow>, KdcError> {
    Ok(sqlx::query_as("SELECT * FROM installed_keys WHERE zone = ? ORDER BY id")
        .bind(zone)
        .fetch_all(pool)
        .await?)
}

pub async fn get_installed_key(pool: &SqlitePool, zone: &str, keytag: i64) -> Result<InstalledKeyRow, KdcError> {
    sqlx::query_as("SELECT * FROM installed_keys WHERE zone = ? AND keytag = ?")
        .bind(zone)
        .bind(keytag)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| KdcError::NotFound(format!("no installed key for zone '{zone}' with keytag {keytag}")))
}

pub async fn delete_installed_key(pool: &SqlitePool, id: i64) -> Result<(), KdcError> {
    let result = sqlx::query("DELETE FROM installed_keys WHERE id = ?").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(KdcError::NotFound(format!("no installed key with id {id}")));
    }
    Ok(())
}

pub async fn purge_installed_keys(pool: &SqlitePool) -> Result<u64, KdcError> {
    Ok(sqlx::query("DELETE FROM installed_keys").execute(pool).await?.rows_affected())
}

/// Retired installed keys whose grace period has elapsed (spec §4.8's
/// local retirement clock).
pub async fn retired_installed_keys_past_grace(pool: &SqlitePool, now: i64) -> Result<Vec<InstalledKeyRow>, KdcError> {
    Ok(sqlx::query_as(
        "SELECT * FROM installed_keys WHERE state = 'retired' AND retired_at IS NOT NULL AND (? - retired_at) >= retire_time_secs",
    )
    .bind(now)
    .fetch_all(pool)
    .await?)
}

pub async fn mark_installed_key_removed(pool: &SqlitePool, id: i64) -> Result<(), KdcError> {
    sqlx::query("UPDATE installed_keys SET state = 'removed' WHERE id = ?").bind(id).execute(pool).await?;
    Ok(())
}

fn map_insert_error(err: sqlx::Error, conflict_message: &str) -> KdcError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return KdcError::Conflict(conflict_message.to_string());
        }
    }
    KdcError::from(err)
}
