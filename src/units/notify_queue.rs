//! The "NQ" unit: periodically retries distributions that still have
//! unconfirmed recipients (spec §4.6 step 7).

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::catalog::store;
use crate::center::Center;
use crate::comms::{ApplicationCommand, ReadySender};
use crate::distribution;

const SWEEP_INTERVAL_SECS: u64 = 60;

pub async fn run(center: Arc<Center>, mut cmd_rx: mpsc::UnboundedReceiver<ApplicationCommand>, ready_tx: ReadySender) {
    let _ = ready_tx.send(());
    let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => sweep(&center).await,
            command = cmd_rx.recv() => match command {
                Some(ApplicationCommand::RunNow) => sweep(&center).await,
                Some(ApplicationCommand::Reconfigure) => {}
                Some(ApplicationCommand::Terminate) | None => {
                    tracing::info!("Unit 'NQ' shutting down");
                    return;
                }
            },
        }
    }
}

async fn sweep(center: &Arc<Center>) {
    let distributions = match store::list_distributions(&center.pool).await {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("Notify queue sweep could not list distributions: {e}");
            return;
        }
    };
    let pending_ids: BTreeSet<&str> = distributions
        .iter()
        .filter(|d| d.status == "pending")
        .map(|d| d.distribution_id.as_str())
        .collect();
    for distribution_id in pending_ids {
        if let Err(e) = distribution::retry(&center, distribution_id).await {
            tracing::warn!("Retrying distribution '{distribution_id}' failed: {e}");
        }
    }
}
