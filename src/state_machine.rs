//! The key-state machine (spec §4.3).
//!
//! Transitions are an explicit table keyed by `(current_state, event)` —
//! spec §9 calls for exactly this shape instead of dispatched virtual
//! methods — with the "one hot key per slot" invariant enforced by
//! retiring the prior holder before the new state is written.

use sqlx::SqlitePool;

use crate::catalog::store;
use crate::error::KdcError;

/// A requested transition, named after the target state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Publish,
    Standby,
    Activate,
    ActivateDist,
    ActivateCe,
    Distribute,
    Edgesigner,
    Retire,
    Remove,
    Revoke,
}

impl Event {
    fn target_state(self) -> &'static str {
        match self {
            Event::Publish => "published",
            Event::Standby => "standby",
            Event::Activate => "active",
            Event::ActivateDist => "active_dist",
            Event::ActivateCe => "active_ce",
            Event::Distribute => "distributed",
            Event::Edgesigner => "edgesigner",
            Event::Retire => "retired",
            Event::Remove => "removed",
            Event::Revoke => "revoked",
        }
    }
}

/// Is `(current, event)` one of the listed transitions in spec §4.3?
fn is_allowed(current: &str, event: Event) -> bool {
    use Event::*;
    match (current, event) {
        ("created", Publish) => true,
        ("published", Standby) => true,
        // KSK under "edge_full": standby -> active -> active_dist -> active_ce.
        ("standby", Activate) => true,
        ("active", ActivateDist) => true,
        ("active_dist", ActivateCe) => true,
        // ZSK under any "edge_*" mode: standby -> distributed -> edgesigner.
        ("standby", Distribute) => true,
        ("distributed", Edgesigner) => true,
        // Every other state is a terminal off-ramp reachable from anywhere.
        (_, Retire) => true,
        ("retired", Remove) => true,
        (_, Revoke) => true,
        _ => false,
    }
}

/// Apply `event` to key `id`, enforcing the transition table and the
/// at-most-one-hot invariant (spec §4.3, invariant 1).
pub async fn transition(pool: &SqlitePool, id: i64, event: Event) -> Result<crate::catalog::KeyRow, KdcError> {
    let key = store::get_key(pool, id).await?;
    if !is_allowed(&key.state, event) {
        return Err(KdcError::Validation(format!(
            "illegal transition for key {id}: {} -> {:?}",
            key.state, event
        )));
    }

    let now = crate::common::now();
    let target = event.target_state();

    if matches!(event, Event::Edgesigner | Event::ActivateDist | Event::ActivateCe) {
        retire_old_keys_for_zone(pool, &key.zone, &key.key_type, event, id, now).await?;
    }

    let comment = format!("{} -> {target} at {now}", key.state);
    store::set_key_state(pool, id, target, &comment, now).await
}

/// `RetireOldKeysForZone(zone, type, excluding=this_key)` (spec §4.3):
/// retires any key of the same (zone, type) currently in the hot state
/// that `event` is about to occupy, plus — for `ActivateCe` — keys stuck
/// in `active_dist` left over from a concurrent distribution.
async fn retire_old_keys_for_zone(pool: &SqlitePool, zone: &str, key_type: &str, event: Event, excluding: i64, now: i64) -> Result<(), KdcError> {
    let hot_state = event.target_state();
    retire_keys_in_state(pool, zone, key_type, hot_state, excluding, now).await?;
    if event == Event::ActivateCe {
        retire_keys_in_state(pool, zone, key_type, "active_dist", excluding, now).await?;
    }
    Ok(())
}

async fn retire_keys_in_state(pool: &SqlitePool, zone: &str, key_type: &str, state: &str, excluding: i64, now: i64) -> Result<(), KdcError> {
    for key in store::keys_in_state(pool, zone, key_type, state).await? {
        if key.id == excluding {
            continue;
        }
        let comment = format!("{state} -> retired (superseded by key {excluding}) at {now}");
        store::set_key_state(pool, key.id, "retired", &comment, now).await?;
    }
    Ok(())
}

/// `PurgeRemoved`: bulk-delete every key in the terminal `removed` state.
pub async fn purge_removed(pool: &SqlitePool) -> Result<u64, KdcError> {
    store::purge_removed_keys(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_is_allowed_from_created() {
        assert!(is_allowed("created", Event::Publish));
    }

    #[test]
    fn publish_is_not_allowed_from_standby() {
        assert!(!is_allowed("standby", Event::Publish));
    }

    #[test]
    fn retire_is_allowed_from_any_state() {
        for state in ["created", "published", "standby", "active", "distributed", "edgesigner"] {
            assert!(is_allowed(state, Event::Retire));
        }
    }

    #[test]
    fn remove_requires_retired() {
        assert!(is_allowed("retired", Event::Remove));
        assert!(!is_allowed("active", Event::Remove));
    }
}
