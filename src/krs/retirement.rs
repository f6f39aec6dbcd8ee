//! The KRS's local retirement clock (spec §4.8): installed keys past
//! their grace period move from `retired` to `removed`.

use std::time::Duration;

use sqlx::SqlitePool;

use crate::catalog::store;

/// Run forever, sweeping every `sweep_interval_secs`. Intended to be
/// `tokio::spawn`ed once by `krsd`, alongside the admin HTTP server.
pub async fn run(pool: SqlitePool, sweep_interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval_secs.max(1)));
    loop {
        interval.tick().await;
        sweep(&pool).await;
    }
}

async fn sweep(pool: &SqlitePool) {
    let now = crate::common::now();
    let due = match store::retired_installed_keys_past_grace(pool, now).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("Retirement sweep could not list due keys: {e}");
            return;
        }
    };
    for key in due {
        let id = key.id;
        match store::mark_installed_key_removed(pool, id).await {
            Ok(()) => tracing::info!("Installed key {id} ({} {}) removed after its retirement grace period", key.zone, key.key_type),
            Err(e) => tracing::warn!("Could not remove installed key {id}: {e}"),
        }
    }
}
