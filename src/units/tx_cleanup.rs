//! The "TX" unit: periodically expires stale open service transactions
//! (spec §4.5: a transaction older than its TTL is rolled back).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::catalog::store;
use crate::center::Center;
use crate::comms::{ApplicationCommand, ReadySender};

const SWEEP_INTERVAL_SECS: u64 = 300;

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
                    tracing::info!("Unit 'TX' shutting down");
                    return;
                }
            },
        }
    }
}

async fn sweep(center: &Arc<Center>) {
    match store::expire_transactions(&center.pool, crate::common::now()).await {
        Ok(n) if n > 0 => tracing::info!("Expired {n} stale open transaction(s)"),
        Ok(_) => {}
        Err(e) => tracing::warn!("Transaction cleanup sweep failed: {e}"),
    }
}
